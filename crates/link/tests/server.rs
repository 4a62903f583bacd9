use hl_files::LogWriter;
use hl_link::{Binder, LinkStatus, Listener, ServerConfig, SyncServer};
use hl_proto::{LogRecord, LogRecordCodec};

use std::{
	io,
	net::SocketAddr,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tempfile::tempdir;
use tokio::{
	io::AsyncReadExt,
	net::{TcpListener, TcpStream},
	sync::{mpsc, watch, Notify},
	time::{sleep, timeout},
};
use tokio_util::codec::Framed;
use tracing_test::traced_test;

mod common;

use common::{record, transport_config, wait_for, within};

fn server_config() -> ServerConfig {
	ServerConfig {
		bind_addr: "127.0.0.1:0".parse().unwrap(),
		advertise: false,
		listener_retry_delay_ms: 10,
		transport: transport_config(),
		..Default::default()
	}
}

async fn start(sink: mpsc::UnboundedSender<LogRecord>) -> (SyncServer, SocketAddr) {
	let server = SyncServer::start(server_config(), Arc::new(sink))
		.await
		.unwrap();
	let addr = server.local_addr().borrow().unwrap();
	(server, addr)
}

async fn connect(addr: SocketAddr) -> Framed<TcpStream, LogRecordCodec> {
	Framed::new(
		TcpStream::connect(addr).await.unwrap(),
		LogRecordCodec::default(),
	)
}

async fn ready(status: &mut watch::Receiver<LinkStatus>) -> LinkStatus {
	wait_for(status, LinkStatus::is_ready).await
}

/// Binds loopback listeners. The listener currently accepting fails once [`FlakyBinder::fail`] is
/// called.
#[derive(Default)]
struct FlakyBinder {
	failure: Arc<Notify>,
	binds: AtomicUsize,
}

impl FlakyBinder {
	fn fail(&self) {
		self.failure.notify_one();
	}

	fn binds(&self) -> usize {
		self.binds.load(Ordering::SeqCst)
	}
}

struct FlakyListener {
	inner: TcpListener,
	failure: Arc<Notify>,
}

#[async_trait]
impl Binder for FlakyBinder {
	type Listener = FlakyListener;

	async fn bind(&self, addr: SocketAddr) -> io::Result<FlakyListener> {
		self.binds.fetch_add(1, Ordering::SeqCst);
		Ok(FlakyListener {
			inner: TcpListener::bind(addr).await?,
			failure: self.failure.clone(),
		})
	}
}

#[async_trait]
impl Listener for FlakyListener {
	type Io = TcpStream;

	async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
		tokio::select! {
			accepted = self.inner.accept() => accepted,
			_ = self.failure.notified() => Err(io::Error::other("listener broke")),
		}
	}

	fn local_addr(&self) -> io::Result<SocketAddr> {
		self.inner.local_addr()
	}
}

#[tokio::test]
#[traced_test]
async fn second_client_is_closed_immediately() {
	let (tx, mut rx) = mpsc::unbounded_channel();
	let (server, addr) = start(tx).await;
	let mut status = server.status();

	let mut first = connect(addr).await;
	let first_id = ready(&mut status).await.transport_id();

	let mut second = TcpStream::connect(addr).await.unwrap();
	let mut buf = [0u8; 8];
	assert_eq!(within(second.read(&mut buf)).await.unwrap(), 0);

	// the first client is untouched
	assert_eq!(status.borrow().transport_id(), first_id);
	first.send(record("still here")).await.unwrap();
	assert_eq!(within(rx.recv()).await.unwrap(), record("still here"));

	server.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn slot_frees_once_the_client_leaves() {
	let (tx, _rx) = mpsc::unbounded_channel();
	let (server, addr) = start(tx).await;
	let mut status = server.status();

	let first = connect(addr).await;
	let first_id = ready(&mut status).await.transport_id();

	drop(first);
	wait_for(&mut status, |status| *status == LinkStatus::Disconnected).await;

	let _second = connect(addr).await;
	let second_id = ready(&mut status).await.transport_id();
	assert_ne!(first_id, second_id);

	server.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn send_reaches_the_connected_client() {
	let (tx, _rx) = mpsc::unbounded_channel();
	let (server, addr) = start(tx).await;
	let mut status = server.status();

	let mut client = connect(addr).await;
	ready(&mut status).await;

	server.send(record("hello device"));
	assert_eq!(
		within(client.next()).await.unwrap().unwrap().unwrap(),
		record("hello device")
	);

	server.shutdown().await;
	assert!(within(client.next()).await.is_none());
}

#[tokio::test]
#[traced_test]
async fn send_without_client_is_dropped() {
	let (tx, _rx) = mpsc::unbounded_channel();
	let (server, addr) = start(tx).await;
	let mut status = server.status();

	server.send(record("nobody listens"));
	sleep(Duration::from_millis(20)).await;

	let mut client = connect(addr).await;
	ready(&mut status).await;

	assert!(timeout(Duration::from_millis(100), client.next())
		.await
		.is_err());

	server.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn received_records_are_written_to_disk() {
	let logs = tempdir().unwrap();
	let server = SyncServer::start(
		server_config(),
		Arc::new(LogWriter::confined_to(logs.path())),
	)
	.await
	.unwrap();
	let addr = server.local_addr().borrow().unwrap();
	let mut status = server.status();

	let mut client = connect(addr).await;
	ready(&mut status).await;

	client
		.send(
			LogRecord::new_session("/logs/App.log", "App")
				.with_device_info(Some("Pixel 8\n".to_string())),
		)
		.await
		.unwrap();
	client.send(record("first line\n")).await.unwrap();

	let expected = logs.path().join("logs").join("App_2.log");
	within(async {
		loop {
			match std::fs::read_to_string(&expected) {
				Ok(contents) if contents.ends_with("first line\n") => break contents,
				_ => sleep(Duration::from_millis(10)).await,
			}
		}
	})
	.await;

	assert_eq!(
		std::fs::read_to_string(&expected).unwrap(),
		"Pixel 8\nfirst line\n"
	);

	server.shutdown().await;
}

#[tokio::test]
#[traced_test]
async fn failed_listener_is_rebuilt() {
	let (tx, _rx) = mpsc::unbounded_channel();
	let binder = Arc::new(FlakyBinder::default());
	let config = ServerConfig {
		listener_retry_delay_ms: 200,
		..server_config()
	};
	let server = SyncServer::with_binder(config, binder.clone(), Arc::new(tx))
		.await
		.unwrap();
	let mut local_addr = server.local_addr();
	let mut status = server.status();

	let first_addr = local_addr.borrow().unwrap();
	let mut client = TcpStream::connect(first_addr).await.unwrap();
	ready(&mut status).await;

	binder.fail();

	// the connected client goes down with the listener
	let mut buf = [0u8; 8];
	assert_eq!(within(client.read(&mut buf)).await.unwrap(), 0);
	wait_for(&mut status, |status| *status == LinkStatus::Disconnected).await;
	wait_for(&mut local_addr, |addr| addr.is_none()).await;

	let second_addr = wait_for(&mut local_addr, |addr| addr.is_some())
		.await
		.unwrap();
	assert_eq!(binder.binds(), 2);

	let _client = connect(second_addr).await;
	ready(&mut status).await;

	server.shutdown().await;
}
