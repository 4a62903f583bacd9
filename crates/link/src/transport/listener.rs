use std::{io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use tokio::{
	io::{AsyncRead, AsyncWrite},
	net::{TcpListener, TcpStream},
};
use tracing::warn;

use crate::configure_stream;

/// Creates the listeners a [`crate::SyncServer`] accepts clients on. Called again every time the
/// current listener fails.
#[async_trait]
pub trait Binder: Send + Sync + 'static {
	type Listener: Listener;

	async fn bind(&self, addr: SocketAddr) -> io::Result<Self::Listener>;
}

/// Accepts the byte streams underneath server [`crate::Transport`]s.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
	type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

	async fn accept(&self) -> io::Result<(Self::Io, SocketAddr)>;

	fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Binds TCP listeners whose connections get the same socket options as dialed ones.
#[derive(Debug, Clone)]
pub struct TcpBinder {
	keepalive_idle: Duration,
}

impl TcpBinder {
	pub fn new(keepalive_idle: Duration) -> Self {
		Self { keepalive_idle }
	}
}

#[async_trait]
impl Binder for TcpBinder {
	type Listener = TcpAcceptor;

	async fn bind(&self, addr: SocketAddr) -> io::Result<TcpAcceptor> {
		Ok(TcpAcceptor {
			listener: TcpListener::bind(addr).await?,
			keepalive_idle: self.keepalive_idle,
		})
	}
}

#[derive(Debug)]
pub struct TcpAcceptor {
	listener: TcpListener,
	keepalive_idle: Duration,
}

#[async_trait]
impl Listener for TcpAcceptor {
	type Io = TcpStream;

	async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
		let (stream, peer) = self.listener.accept().await?;
		if let Err(e) = configure_stream(&stream, self.keepalive_idle) {
			warn!("failed to configure connection from '{peer}': {e}");
		}

		Ok((stream, peer))
	}

	fn local_addr(&self) -> io::Result<SocketAddr> {
		self.listener.local_addr()
	}
}
