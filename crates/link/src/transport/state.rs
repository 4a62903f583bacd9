use crate::{FailureCause, IllegalTransition};

/// Lifecycle of a [`crate::Transport`].
///
/// ```text
/// Connecting --Established--> Ready
/// Connecting | Ready --Fail--> Failed
/// Failed --Reconnect--> Connecting      (client role, transient causes only)
/// any --Cancel--> Cancelled             (terminal)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
	Connecting,
	Ready,
	Failed(FailureCause),
	Cancelled,
}

/// Inputs driving [`TransportState::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
	Established,
	Fail(FailureCause),
	Reconnect,
	Cancel,
}

impl TransportState {
	pub fn transition(&self, event: &StateEvent) -> Result<Self, IllegalTransition> {
		match (self, event) {
			(Self::Connecting, StateEvent::Established) => Ok(Self::Ready),
			(Self::Connecting | Self::Ready, StateEvent::Fail(cause)) => {
				Ok(Self::Failed(cause.clone()))
			}
			(Self::Failed(_), StateEvent::Reconnect) => Ok(Self::Connecting),
			(_, StateEvent::Cancel) => Ok(Self::Cancelled),
			(from, event) => Err(IllegalTransition {
				from: from.clone(),
				event: event.clone(),
			}),
		}
	}

	pub fn is_ready(&self) -> bool {
		matches!(self, Self::Ready)
	}
}
