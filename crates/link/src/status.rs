use crate::{TransportId, TransportState};

/// What a [`crate::SyncServer`] or [`crate::SyncSession`] is currently connected to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkStatus {
	#[default]
	Disconnected,
	Connection {
		id: TransportId,
		peer: String,
		state: TransportState,
	},
}

impl LinkStatus {
	pub fn is_ready(&self) -> bool {
		matches!(
			self,
			Self::Connection {
				state: TransportState::Ready,
				..
			}
		)
	}

	pub fn transport_id(&self) -> Option<TransportId> {
		match self {
			Self::Disconnected => None,
			Self::Connection { id, .. } => Some(*id),
		}
	}
}
