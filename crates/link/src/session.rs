use std::sync::Arc;

use hl_proto::LogRecord;
use tokio::{
	sync::{mpsc, watch},
	task::JoinHandle,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace};

use crate::{
	active::{next_change, status_of, Active},
	Browser, Connector, Endpoint, LinkStatus, RecordSink, SessionConfig, TcpConnector, Transport,
};

/// Device side of the link.
///
/// Browses for a host and connects to the first one it finds. Records passed to
/// [`SyncSession::send_record`] reach the host only while that connection is ready; otherwise they
/// are dropped. Once a connection ends for good the session connects to the next host discovery
/// reports.
pub struct SyncSession {
	records_tx: mpsc::UnboundedSender<LogRecord>,
	status: watch::Receiver<LinkStatus>,
	task: JoinHandle<()>,
	_guard: DropGuard,
}

impl SyncSession {
	/// Browses the local network over mDNS and dials hosts over TCP.
	pub fn start(config: SessionConfig, sink: Arc<dyn RecordSink>) -> Self {
		let (browser, endpoints) =
			Browser::spawn(config.service_type.clone(), config.browse_restart_delay());
		let connector = Arc::new(TcpConnector::new(config.transport.keepalive_idle()));

		Self::spawn(config, endpoints, connector, sink, Some(browser))
	}

	/// Takes endpoints from `endpoints` instead of mDNS and dials them with `connector`.
	pub fn with_endpoints<C: Connector>(
		config: SessionConfig,
		endpoints: mpsc::UnboundedReceiver<Endpoint>,
		connector: Arc<C>,
		sink: Arc<dyn RecordSink>,
	) -> Self {
		Self::spawn(config, endpoints, connector, sink, None)
	}

	fn spawn<C: Connector>(
		config: SessionConfig,
		endpoints: mpsc::UnboundedReceiver<Endpoint>,
		connector: Arc<C>,
		sink: Arc<dyn RecordSink>,
		browser: Option<Browser>,
	) -> Self {
		let (records_tx, records) = mpsc::unbounded_channel();
		let (status_tx, status) = watch::channel(LinkStatus::Disconnected);
		let cancel = CancellationToken::new();

		let actor = SessionActor {
			config,
			connector,
			sink,
			endpoints: Some(endpoints),
			records,
			status: status_tx,
			active: None,
			cancel: cancel.clone(),
			_browser: browser,
		};

		Self {
			records_tx,
			status,
			task: tokio::spawn(actor.run()),
			_guard: cancel.drop_guard(),
		}
	}

	/// Forwards `record` to the host. A no-op unless connected.
	pub fn send_record(&self, record: LogRecord) {
		if self.records_tx.send(record).is_err() {
			trace!("sync session has shut down, dropping record");
		}
	}

	pub fn status(&self) -> watch::Receiver<LinkStatus> {
		self.status.clone()
	}

	pub fn is_ready(&self) -> bool {
		self.status.borrow().is_ready()
	}

	/// Cancels the connection and stops browsing.
	pub async fn shutdown(self) {
		let Self {
			task,
			_guard: guard,
			..
		} = self;
		drop(guard);

		if let Err(e) = task.await {
			error!("sync session task failed: {e}");
		}
	}
}

struct SessionActor<C> {
	config: SessionConfig,
	connector: Arc<C>,
	sink: Arc<dyn RecordSink>,
	endpoints: Option<mpsc::UnboundedReceiver<Endpoint>>,
	records: mpsc::UnboundedReceiver<LogRecord>,
	status: watch::Sender<LinkStatus>,
	active: Option<Active>,
	cancel: CancellationToken,
	_browser: Option<Browser>,
}

impl<C: Connector> SessionActor<C> {
	async fn run(mut self) {
		loop {
			tokio::select! {
				_ = self.cancel.cancelled() => break,
				endpoint = next_endpoint(self.endpoints.as_mut()) => match endpoint {
					Some(endpoint) => self.on_endpoint(endpoint),
					None => {
						debug!("no more endpoints will be discovered");
						self.endpoints = None;
					}
				},
				record = self.records.recv() => match record {
					Some(record) => self.send(record),
					None => break,
				},
				change = next_change(self.active.as_mut()) => match change {
					Some(state) => {
						debug!("connection is now {state:?}");
						self.publish();
					}
					None => {
						info!("connection to host closed");
						self.active = None;
						self.publish();
					}
				},
			}
		}

		if let Some(active) = self.active.take() {
			active.transport.cancel();
		}
		self.publish();
		debug!("sync session stopped");
	}

	fn on_endpoint(&mut self, endpoint: Endpoint) {
		if let Some(active) = &self.active {
			trace!(
				"ignoring '{endpoint}', already connected to '{}'",
				active.transport.peer()
			);
			return;
		}

		info!("connecting to '{endpoint}'");
		self.active = Some(Active::new(Transport::open(
			endpoint,
			self.connector.clone(),
			self.config.transport.clone(),
			self.sink.clone(),
		)));
		self.publish();
	}

	fn send(&self, record: LogRecord) {
		match &self.active {
			Some(active) if active.transport.is_ready() => {
				if let Err(e) = active.transport.send(record) {
					debug!("dropping record: {e}");
				}
			}
			_ => trace!("not connected, dropping record for '{}'", record.file_name),
		}
	}

	fn publish(&self) {
		self.status.send_replace(status_of(self.active.as_ref()));
	}
}

async fn next_endpoint(
	endpoints: Option<&mut mpsc::UnboundedReceiver<Endpoint>>,
) -> Option<Endpoint> {
	match endpoints {
		Some(endpoints) => endpoints.recv().await,
		None => std::future::pending().await,
	}
}
