use std::{io, sync::Arc};

use futures::{SinkExt, StreamExt};
use hl_proto::{LogRecord, LogRecordCodec, MalformedMessage};
use tokio::{
	io::{split, AsyncRead, AsyncWrite},
	sync::{mpsc, watch},
	time::sleep,
};
use tokio_util::{
	codec::{FramedRead, FramedWrite},
	sync::{CancellationToken, DropGuard},
};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::{Endpoint, FailureCause, RecordSink, TransportConfig, TransportError};

mod connector;
mod listener;
mod state;

pub use connector::*;
pub use listener::*;
pub use state::*;

pub type TransportId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	/// Dialed an endpoint. Redials it after a transient failure.
	Client,
	/// Accepted from a listener. Never redials.
	Server,
}

/// One duplex connection carrying [`LogRecord`]s.
///
/// The connection is driven by its own task. This handle observes its [`TransportState`], queues
/// outbound records and cancels it. Dropping the handle cancels the connection.
#[derive(Debug)]
pub struct Transport {
	id: TransportId,
	role: Role,
	peer: String,
	states: watch::Receiver<TransportState>,
	outbound_tx: mpsc::UnboundedSender<LogRecord>,
	cancel: CancellationToken,
	_guard: DropGuard,
}

impl Transport {
	/// Dials `endpoint` in the background, starting in [`TransportState::Connecting`].
	pub fn open<C: Connector>(
		endpoint: Endpoint,
		connector: Arc<C>,
		config: TransportConfig,
		sink: Arc<dyn RecordSink>,
	) -> Self {
		let (this, driver) = Self::new(Role::Client, endpoint.to_string(), config, sink);
		tokio::spawn(driver.run_client(endpoint, connector));
		this
	}

	/// Wraps an already accepted stream.
	pub fn accept<S>(
		io: S,
		peer: impl Into<String>,
		config: TransportConfig,
		sink: Arc<dyn RecordSink>,
	) -> Self
	where
		S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
	{
		let (this, driver) = Self::new(Role::Server, peer.into(), config, sink);
		tokio::spawn(driver.run_server(io));
		this
	}

	fn new(
		role: Role,
		peer: String,
		config: TransportConfig,
		sink: Arc<dyn RecordSink>,
	) -> (Self, Driver) {
		let id = Uuid::new_v4();
		let (state_tx, states) = watch::channel(TransportState::Connecting);
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let cancel = CancellationToken::new();

		debug!("transport '{id}' created as {role:?} for '{peer}'");

		(
			Self {
				id,
				role,
				peer,
				states,
				outbound_tx,
				_guard: cancel.clone().drop_guard(),
				cancel: cancel.clone(),
			},
			Driver {
				id,
				config,
				sink,
				state_tx,
				outbound_rx,
				cancel,
			},
		)
	}

	pub fn id(&self) -> TransportId {
		self.id
	}

	pub fn role(&self) -> Role {
		self.role
	}

	pub fn peer(&self) -> &str {
		&self.peer
	}

	pub fn state(&self) -> TransportState {
		self.states.borrow().clone()
	}

	/// Receives every state change until the connection task exits.
	pub fn subscribe(&self) -> watch::Receiver<TransportState> {
		self.states.clone()
	}

	pub fn is_ready(&self) -> bool {
		self.states.borrow().is_ready()
	}

	/// `true` once the connection task has exited, either cancelled or after a terminal failure.
	pub fn is_closed(&self) -> bool {
		self.states.has_changed().is_err()
	}

	/// Resolves once the connection task has exited.
	pub async fn closed(&self) {
		let mut states = self.states.clone();
		while states.changed().await.is_ok() {}
	}

	/// Queues `record` for delivery. Delivery itself is best effort: queued records are dropped if
	/// the connection fails before they are written.
	pub fn send(&self, record: LogRecord) -> Result<(), TransportError> {
		if !self.is_ready() {
			return Err(TransportError::NotReady);
		}

		self.outbound_tx
			.send(record)
			.map_err(|_| TransportError::Closed)
	}

	/// Moves the transport to [`TransportState::Cancelled`] and releases the socket. Idempotent.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}
}

struct Driver {
	id: TransportId,
	config: TransportConfig,
	sink: Arc<dyn RecordSink>,
	state_tx: watch::Sender<TransportState>,
	outbound_rx: mpsc::UnboundedReceiver<LogRecord>,
	cancel: CancellationToken,
}

impl Driver {
	fn apply(&self, event: StateEvent) {
		let current = self.state_tx.borrow().clone();
		match current.transition(&event) {
			Ok(next) if next != current => {
				debug!("transport '{}': {current:?} -> {next:?}", self.id);
				self.state_tx.send_replace(next);
			}
			Ok(_) => {}
			Err(e) => error!("transport '{}': {e}", self.id),
		}
	}

	async fn run_client<C: Connector>(mut self, endpoint: Endpoint, connector: Arc<C>) {
		loop {
			let dialed = tokio::select! {
				_ = self.cancel.cancelled() => break,
				dialed = connector.connect(&endpoint) => dialed,
			};

			let outcome = match dialed {
				Ok(io) => self.serve(io).await,
				Err(e) => Err(FailureCause::from_io(&e)),
			};

			// `Ok` means we were cancelled
			let Err(cause) = outcome else { break };

			warn!("transport '{}' to '{endpoint}' failed: {cause}", self.id);
			let transient = cause.is_transient();
			self.apply(StateEvent::Fail(cause));
			self.discard_pending();

			if !transient {
				return;
			}

			info!("transport '{}' redialing '{endpoint}'", self.id);
			tokio::select! {
				_ = self.cancel.cancelled() => break,
				_ = sleep(self.config.reconnect_delay()) => {}
			}
			self.apply(StateEvent::Reconnect);
		}

		self.apply(StateEvent::Cancel);
	}

	async fn run_server<S>(mut self, io: S)
	where
		S: AsyncRead + AsyncWrite,
	{
		match self.serve(io).await {
			Ok(()) => self.apply(StateEvent::Cancel),
			Err(cause) => {
				warn!("transport '{}' failed: {cause}", self.id);
				self.apply(StateEvent::Fail(cause));
				self.discard_pending();
			}
		}
	}

	/// Runs one established connection until it is cancelled (`Ok`) or fails (`Err`).
	///
	/// Cancelling drops the socket without flushing, so a peer that stopped reading cannot hold the
	/// connection open.
	async fn serve<S>(&mut self, io: S) -> Result<(), FailureCause>
	where
		S: AsyncRead + AsyncWrite,
	{
		let (read_half, write_half) = split(io);
		let mut reader = FramedRead::new(read_half, LogRecordCodec::new(self.config.max_frame_len));
		let mut writer = FramedWrite::new(write_half, LogRecordCodec::new(self.config.max_frame_len));
		self.apply(StateEvent::Established);

		loop {
			tokio::select! {
				_ = self.cancel.cancelled() => return Ok(()),
				record = self.outbound_rx.recv() => {
					let Some(record) = record else { return Ok(()) };

					self.deliver(&mut writer, &mut reader, record).await?;
					if self.cancel.is_cancelled() {
						return Ok(());
					}
				}
				frame = reader.next() => self.on_frame(frame).await?,
			}
		}
	}

	/// Writes one record. Inbound frames keep flowing and cancellation still applies while the peer
	/// is slow to read.
	async fn deliver<R, W>(
		&self,
		writer: &mut FramedWrite<W, LogRecordCodec>,
		reader: &mut FramedRead<R, LogRecordCodec>,
		record: LogRecord,
	) -> Result<(), FailureCause>
	where
		R: AsyncRead + Unpin,
		W: AsyncWrite + Unpin,
	{
		let write = writer.send(record);
		tokio::pin!(write);

		loop {
			tokio::select! {
				_ = self.cancel.cancelled() => return Ok(()),
				sent = &mut write => {
					sent.map_err(|e| FailureCause::from_io(&e))?;
					trace!("transport '{}' delivered a record", self.id);
					return Ok(());
				}
				frame = reader.next() => self.on_frame(frame).await?,
			}
		}
	}

	async fn on_frame(
		&self,
		frame: Option<io::Result<Result<LogRecord, MalformedMessage>>>,
	) -> Result<(), FailureCause> {
		match frame {
			Some(Ok(Ok(record))) => self.sink.on_record(record).await,
			Some(Ok(Err(e))) => debug!("transport '{}' dropped {e}", self.id),
			Some(Err(e)) => return Err(FailureCause::from_io(&e)),
			None => return Err(FailureCause::Closed),
		}

		Ok(())
	}

	fn discard_pending(&mut self) {
		let mut dropped = 0;
		while self.outbound_rx.try_recv().is_ok() {
			dropped += 1;
		}

		if dropped > 0 {
			debug!("transport '{}' dropped {dropped} undelivered records", self.id);
		}
	}
}
