use std::{fmt, io};

use thiserror::Error;

use crate::{StateEvent, TransportState};

/// Why a connection stopped working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
	/// The peer aborted the connection, which is what happens when the app on the device is
	/// suspended. This is the only transient cause: a client redials the same endpoint.
	Aborted,
	/// The peer closed the stream.
	Closed,
	/// The peer sent a frame the codec refused, eg. one over the size limit.
	Protocol(String),
	/// Any other socket error.
	Io { kind: io::ErrorKind, message: String },
}

impl FailureCause {
	pub fn from_io(err: &io::Error) -> Self {
		match err.kind() {
			io::ErrorKind::ConnectionAborted => Self::Aborted,
			io::ErrorKind::UnexpectedEof => Self::Closed,
			io::ErrorKind::InvalidData => Self::Protocol(err.to_string()),
			kind => Self::Io {
				kind,
				message: err.to_string(),
			},
		}
	}

	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Aborted)
	}
}

impl fmt::Display for FailureCause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Aborted => write!(f, "connection aborted by peer"),
			Self::Closed => write!(f, "connection closed by peer"),
			Self::Protocol(message) => write!(f, "protocol error: {message}"),
			Self::Io { message, .. } => write!(f, "{message}"),
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("illegal transport transition from {from:?} on {event:?}")]
pub struct IllegalTransition {
	pub from: TransportState,
	pub event: StateEvent,
}

#[derive(Debug, Error)]
pub enum TransportError {
	#[error("transport is not ready")]
	NotReady,
	#[error("transport has shut down")]
	Closed,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("mDNS daemon error: {0}")]
	Daemon(#[from] mdns_sd::Error),
	#[error("mDNS browser stopped")]
	BrowserStopped,
}

#[derive(Debug, Error)]
pub enum ServerError {
	#[error("failed to bind listener on '{addr}': {source}")]
	Bind {
		addr: std::net::SocketAddr,
		#[source]
		source: io::Error,
	},
	#[error("listener failed: {0}")]
	Listener(#[source] io::Error),
}
