use std::{io, time::Duration};

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::{
	io::{AsyncRead, AsyncWrite},
	net::TcpStream,
};
use tracing::debug;

use crate::Endpoint;

/// Opens the byte stream underneath a client [`crate::Transport`].
///
/// A client transport keeps its connector so it can redial the same endpoint after a transient failure.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
	type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

	async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Io>;
}

/// Dials endpoints over TCP with keepalive probing enabled.
#[derive(Debug, Clone)]
pub struct TcpConnector {
	keepalive_idle: Duration,
}

impl TcpConnector {
	pub fn new(keepalive_idle: Duration) -> Self {
		Self { keepalive_idle }
	}
}

#[async_trait]
impl Connector for TcpConnector {
	type Io = TcpStream;

	async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
		debug!("dialing '{endpoint}'");
		let stream = TcpStream::connect(endpoint.addrs.as_slice()).await?;
		configure_stream(&stream, self.keepalive_idle)?;
		Ok(stream)
	}
}

/// Applies the socket options every connection uses, on both the dialing and accepting side.
pub fn configure_stream(stream: &TcpStream, keepalive_idle: Duration) -> io::Result<()> {
	stream.set_nodelay(true)?;
	SockRef::from(stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(keepalive_idle))
}
