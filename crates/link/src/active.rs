use std::future::pending;

use tokio::sync::watch;

use crate::{LinkStatus, Transport, TransportState};

/// The single connection a server or session currently owns.
pub(crate) struct Active {
	pub transport: Transport,
	states: watch::Receiver<TransportState>,
}

impl Active {
	pub fn new(transport: Transport) -> Self {
		let states = transport.subscribe();
		Self { transport, states }
	}

	pub fn status(&self) -> LinkStatus {
		LinkStatus::Connection {
			id: self.transport.id(),
			peer: self.transport.peer().to_string(),
			state: self.states.borrow().clone(),
		}
	}
}

/// Next state of the owned connection, or `None` once its task has exited. Never resolves while
/// nothing is owned.
pub(crate) async fn next_change(active: Option<&mut Active>) -> Option<TransportState> {
	let Some(active) = active else {
		return pending().await;
	};

	active.states.changed().await.ok()?;
	let state = active.states.borrow_and_update().clone();
	Some(state)
}

pub(crate) fn status_of(active: Option<&Active>) -> LinkStatus {
	active.map_or(LinkStatus::Disconnected, Active::status)
}
