use std::{net::SocketAddr, path::Path, sync::Arc};

use hl_files::LogWriter;
use hl_link::{LinkStatus, ServerError, SyncServer};
use hl_proto::LogRecord;
use tokio::sync::watch;
use tracing::info;

use crate::NodeConfig;

/// The companion process: a [`SyncServer`] writing every received record below one directory.
pub struct HostNode {
	server: SyncServer,
	writer: LogWriter,
}

impl HostNode {
	pub async fn start(config: &NodeConfig, data_dir: &Path) -> Result<Self, ServerError> {
		let writer = LogWriter::confined_to(config.host_logs_dir(data_dir));
		let server = SyncServer::start(config.host.server.clone(), Arc::new(writer.clone())).await?;

		if let Some(root) = writer.root() {
			info!("writing received logs below '{}'", root.display());
		}

		Ok(Self { server, writer })
	}

	pub fn writer(&self) -> &LogWriter {
		&self.writer
	}

	pub fn status(&self) -> watch::Receiver<LinkStatus> {
		self.server.status()
	}

	pub fn local_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
		self.server.local_addr()
	}

	/// Sends `record` to the connected device, if any.
	pub fn send(&self, record: LogRecord) {
		self.server.send(record);
	}

	pub async fn shutdown(self) {
		self.server.shutdown().await;
	}
}
