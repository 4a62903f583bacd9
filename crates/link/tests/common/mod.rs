#![allow(dead_code)]

use std::{
	collections::VecDeque,
	future::{pending, Future},
	io,
	pin::Pin,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Mutex,
	},
	task::{Context, Poll},
	time::Duration,
};

use async_trait::async_trait;
use hl_link::{Connector, Endpoint, SessionConfig, TransportConfig};
use hl_proto::LogRecord;
use tokio::{
	io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf},
	sync::watch,
	time::timeout,
};

pub const WAIT: Duration = Duration::from_secs(5);

pub fn transport_config() -> TransportConfig {
	TransportConfig {
		reconnect_delay_ms: 10,
		..Default::default()
	}
}

pub fn session_config() -> SessionConfig {
	SessionConfig {
		transport: transport_config(),
		..Default::default()
	}
}

pub fn record(message: &str) -> LogRecord {
	LogRecord::append("/logs/App.log", "App", message)
}

/// Fails the test instead of hanging it.
pub async fn within<F: Future>(future: F) -> F::Output {
	timeout(WAIT, future).await.expect("timed out")
}

pub async fn wait_for<T: Clone>(
	rx: &mut watch::Receiver<T>,
	mut predicate: impl FnMut(&T) -> bool,
) -> T {
	within(rx.wait_for(|value| predicate(value)))
		.await
		.expect("watch channel closed")
		.clone()
}

/// What the next dial of a [`ScriptedConnector`] does.
pub enum Dial {
	/// Connects, then every read fails with `ConnectionAborted`.
	Abort,
	Fail(io::ErrorKind),
	Connect(DuplexStream),
}

/// Connector playing back a fixed list of dial outcomes. Dials past the end of the script never
/// complete.
#[derive(Default)]
pub struct ScriptedConnector {
	script: Mutex<VecDeque<Dial>>,
	dialed: Mutex<Vec<Endpoint>>,
	dials: AtomicUsize,
}

impl ScriptedConnector {
	pub fn new(script: impl IntoIterator<Item = Dial>) -> Self {
		Self {
			script: Mutex::new(script.into_iter().collect()),
			..Default::default()
		}
	}

	pub fn dials(&self) -> usize {
		self.dials.load(Ordering::SeqCst)
	}

	pub fn dialed(&self) -> Vec<Endpoint> {
		self.dialed.lock().unwrap().clone()
	}
}

#[async_trait]
impl Connector for ScriptedConnector {
	type Io = ScriptedStream;

	async fn connect(&self, endpoint: &Endpoint) -> io::Result<ScriptedStream> {
		self.dials.fetch_add(1, Ordering::SeqCst);
		self.dialed.lock().unwrap().push(endpoint.clone());

		let next = self.script.lock().unwrap().pop_front();
		match next {
			Some(Dial::Abort) => Ok(ScriptedStream::Aborting),
			Some(Dial::Fail(kind)) => Err(kind.into()),
			Some(Dial::Connect(io)) => Ok(ScriptedStream::Duplex(io)),
			None => pending().await,
		}
	}
}

pub enum ScriptedStream {
	Aborting,
	Duplex(DuplexStream),
}

impl AsyncRead for ScriptedStream {
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Aborting => Poll::Ready(Err(io::ErrorKind::ConnectionAborted.into())),
			Self::Duplex(io) => Pin::new(io).poll_read(cx, buf),
		}
	}
}

impl AsyncWrite for ScriptedStream {
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<io::Result<usize>> {
		match self.get_mut() {
			Self::Aborting => Poll::Ready(Err(io::ErrorKind::ConnectionAborted.into())),
			Self::Duplex(io) => Pin::new(io).poll_write(cx, buf),
		}
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Aborting => Poll::Ready(Ok(())),
			Self::Duplex(io) => Pin::new(io).poll_flush(cx),
		}
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		match self.get_mut() {
			Self::Aborting => Poll::Ready(Ok(())),
			Self::Duplex(io) => Pin::new(io).poll_shutdown(cx),
		}
	}
}
