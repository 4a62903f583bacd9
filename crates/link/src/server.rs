use std::{future::pending, io, net::SocketAddr, sync::Arc};

use hl_proto::LogRecord;
use tokio::{
	sync::{mpsc, watch},
	task::JoinHandle,
	time::sleep,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace, warn};

use crate::{
	active::{next_change, status_of, Active},
	Advertiser, Binder, LinkStatus, Listener, RecordSink, ServerConfig, ServerError, TcpBinder,
	Transport,
};

/// Host side of the link.
///
/// Listens on TCP, advertises the listener over mDNS and accepts one client at a time. Any other
/// client connecting while one is active is closed straight away. Received records go to the sink
/// the server was started with.
pub struct SyncServer {
	records_tx: mpsc::UnboundedSender<LogRecord>,
	status: watch::Receiver<LinkStatus>,
	local_addr: watch::Receiver<Option<SocketAddr>>,
	task: JoinHandle<()>,
	_guard: DropGuard,
}

impl SyncServer {
	/// Binds the first TCP listener. Listeners failing later on are rebuilt in the background.
	pub async fn start(
		config: ServerConfig,
		sink: Arc<dyn RecordSink>,
	) -> Result<Self, ServerError> {
		let binder = Arc::new(TcpBinder::new(config.transport.keepalive_idle()));
		Self::with_binder(config, binder, sink).await
	}

	/// Same as [`SyncServer::start`] with listeners created by `binder`.
	pub async fn with_binder<B: Binder>(
		config: ServerConfig,
		binder: Arc<B>,
		sink: Arc<dyn RecordSink>,
	) -> Result<Self, ServerError> {
		let listening = Listening::bind(binder.as_ref(), &config).await?;

		let (records_tx, records) = mpsc::unbounded_channel();
		let (status_tx, status) = watch::channel(LinkStatus::Disconnected);
		let (local_addr_tx, local_addr) = watch::channel(Some(listening.local_addr));
		let cancel = CancellationToken::new();

		let actor = ServerActor {
			config,
			binder,
			sink,
			listening: Some(listening),
			active: None,
			records,
			status: status_tx,
			local_addr: local_addr_tx,
			cancel: cancel.clone(),
		};

		Ok(Self {
			records_tx,
			status,
			local_addr,
			task: tokio::spawn(actor.run()),
			_guard: cancel.drop_guard(),
		})
	}

	/// Forwards `record` to the connected client. Dropped when nobody is connected.
	pub fn send(&self, record: LogRecord) {
		if self.records_tx.send(record).is_err() {
			trace!("sync server has shut down, dropping record");
		}
	}

	pub fn status(&self) -> watch::Receiver<LinkStatus> {
		self.status.clone()
	}

	/// Address of the current listener, `None` while it is being rebuilt.
	pub fn local_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
		self.local_addr.clone()
	}

	/// Closes the client connection, the listener and the advertisement.
	pub async fn shutdown(self) {
		let Self {
			task,
			_guard: guard,
			..
		} = self;
		drop(guard);

		if let Err(e) = task.await {
			error!("sync server task failed: {e}");
		}
	}
}

struct Listening<L> {
	listener: L,
	local_addr: SocketAddr,
	_advertiser: Option<Advertiser>,
}

impl<L: Listener> Listening<L> {
	async fn bind<B>(binder: &B, config: &ServerConfig) -> Result<Self, ServerError>
	where
		B: Binder<Listener = L>,
	{
		let listener = binder
			.bind(config.bind_addr)
			.await
			.map_err(|source| ServerError::Bind {
				addr: config.bind_addr,
				source,
			})?;
		let local_addr = listener.local_addr().map_err(ServerError::Listener)?;
		info!("listening on '{local_addr}'");

		// An unadvertised listener still serves clients that know the address. The next rebuild
		// tries again.
		let advertiser = config
			.advertise
			.then(|| {
				Advertiser::register(
					&config.service_type,
					&config.instance_name,
					local_addr.port(),
				)
			})
			.transpose()
			.unwrap_or_else(|e| {
				warn!("serving without mdns advertisement: {e}");
				None
			});

		Ok(Self {
			listener,
			local_addr,
			_advertiser: advertiser,
		})
	}
}

struct ServerActor<B: Binder> {
	config: ServerConfig,
	binder: Arc<B>,
	sink: Arc<dyn RecordSink>,
	listening: Option<Listening<B::Listener>>,
	active: Option<Active>,
	records: mpsc::UnboundedReceiver<LogRecord>,
	status: watch::Sender<LinkStatus>,
	local_addr: watch::Sender<Option<SocketAddr>>,
	cancel: CancellationToken,
}

impl<B: Binder> ServerActor<B> {
	async fn run(mut self) {
		loop {
			tokio::select! {
				_ = self.cancel.cancelled() => break,
				accepted = accept(self.listening.as_ref()) => match accepted {
					Ok((stream, peer)) => self.on_accept(stream, peer),
					Err(e) if is_connection_error(&e) => debug!("dropped half open connection: {e}"),
					Err(e) => {
						error!("{}", ServerError::Listener(e));
						if !self.rebuild().await {
							break;
						}
					}
				},
				record = self.records.recv() => match record {
					Some(record) => self.send(record),
					None => break,
				},
				change = next_change(self.active.as_mut()) => match change {
					Some(state) => {
						debug!("client connection is now {state:?}");
						self.publish();
					}
					None => {
						info!("client connection closed");
						self.active = None;
						self.publish();
					}
				},
			}
		}

		if let Some(active) = self.active.take() {
			active.transport.cancel();
		}
		self.listening = None;
		self.local_addr.send_replace(None);
		self.publish();
		debug!("sync server stopped");
	}

	fn on_accept(&mut self, stream: <B::Listener as Listener>::Io, peer: SocketAddr) {
		if self
			.active
			.as_ref()
			.is_some_and(|active| active.transport.is_closed())
		{
			self.active = None;
		}

		if let Some(active) = &self.active {
			info!(
				"rejecting '{peer}', '{}' is already connected",
				active.transport.peer()
			);
			return;
		}

		info!("accepted client '{peer}'");
		self.active = Some(Active::new(Transport::accept(
			stream,
			peer.to_string(),
			self.config.transport.clone(),
			self.sink.clone(),
		)));
		self.publish();
	}

	/// Tears the listener and the client connection down, then binds a new listener. Returns
	/// `false` if cancelled first.
	async fn rebuild(&mut self) -> bool {
		if let Some(active) = self.active.take() {
			active.transport.cancel();
			self.publish();
		}
		self.listening = None;
		self.local_addr.send_replace(None);

		loop {
			tokio::select! {
				_ = self.cancel.cancelled() => return false,
				_ = sleep(self.config.listener_retry_delay()) => {}
			}

			match Listening::bind(self.binder.as_ref(), &self.config).await {
				Ok(listening) => {
					self.local_addr.send_replace(Some(listening.local_addr));
					self.listening = Some(listening);
					return true;
				}
				Err(e) => warn!("failed to rebuild listener: {e}"),
			}
		}
	}

	fn send(&self, record: LogRecord) {
		match &self.active {
			Some(active) if active.transport.is_ready() => {
				if let Err(e) = active.transport.send(record) {
					debug!("dropping record: {e}");
				}
			}
			_ => trace!("no client, dropping record for '{}'", record.file_name),
		}
	}

	fn publish(&self) {
		self.status.send_replace(status_of(self.active.as_ref()));
	}
}

async fn accept<L: Listener>(
	listening: Option<&Listening<L>>,
) -> io::Result<(L::Io, SocketAddr)> {
	match listening {
		Some(listening) => listening.listener.accept().await,
		None => pending().await,
	}
}

/// Errors that concern one incoming connection rather than the listener.
fn is_connection_error(e: &io::Error) -> bool {
	matches!(
		e.kind(),
		io::ErrorKind::ConnectionAborted
			| io::ErrorKind::ConnectionReset
			| io::ErrorKind::ConnectionRefused
	)
}
