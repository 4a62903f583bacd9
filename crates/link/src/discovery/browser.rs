use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::{sync::mpsc, time::sleep};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::{DiscoveryError, Endpoint};

/// Browses for a service type until dropped, restarting the underlying mDNS browser whenever it
/// fails.
pub struct Browser {
	_guard: DropGuard,
}

impl Browser {
	/// Every resolved service record is sent on the returned channel, repeats included. Browsing
	/// stops once the receiver is dropped.
	pub fn spawn(
		service_type: impl Into<String>,
		restart_delay: Duration,
	) -> (Self, mpsc::UnboundedReceiver<Endpoint>) {
		Self::spawn_with(Arc::new(MdnsBrowse), service_type.into(), restart_delay)
	}

	fn spawn_with<B: Browse>(
		browse: Arc<B>,
		service_type: String,
		restart_delay: Duration,
	) -> (Self, mpsc::UnboundedReceiver<Endpoint>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let cancel = CancellationToken::new();

		tokio::spawn(run(browse, service_type, restart_delay, tx, cancel.clone()));

		(
			Self {
				_guard: cancel.drop_guard(),
			},
			rx,
		)
	}
}

/// One browsing attempt. `Ok` means nobody is listening for endpoints anymore, `Err` that the
/// attempt failed and should be restarted.
#[async_trait]
trait Browse: Send + Sync + 'static {
	async fn browse(
		&self,
		service_type: &str,
		tx: &mpsc::UnboundedSender<Endpoint>,
	) -> Result<(), DiscoveryError>;
}

async fn run<B: Browse>(
	browse: Arc<B>,
	service_type: String,
	restart_delay: Duration,
	tx: mpsc::UnboundedSender<Endpoint>,
	cancel: CancellationToken,
) {
	loop {
		let outcome = tokio::select! {
			_ = cancel.cancelled() => return,
			outcome = browse.browse(&service_type, &tx) => outcome,
		};

		match outcome {
			Ok(()) => return,
			Err(e) => warn!("mdns browser for '{service_type}' failed, restarting: {e}"),
		}

		tokio::select! {
			_ = cancel.cancelled() => return,
			_ = sleep(restart_delay) => {}
		}
	}
}

/// Shuts the daemon down however browsing ends, cancellation included.
struct BrowseGuard {
	daemon: ServiceDaemon,
}

impl Drop for BrowseGuard {
	fn drop(&mut self) {
		if let Err(e) = self.daemon.shutdown() {
			debug!("error shutting down mdns daemon: {e}");
		}
	}
}

struct MdnsBrowse;

#[async_trait]
impl Browse for MdnsBrowse {
	async fn browse(
		&self,
		service_type: &str,
		tx: &mpsc::UnboundedSender<Endpoint>,
	) -> Result<(), DiscoveryError> {
		browse_mdns(service_type, tx).await
	}
}

async fn browse_mdns(
	service_type: &str,
	tx: &mpsc::UnboundedSender<Endpoint>,
) -> Result<(), DiscoveryError> {
	let guard = BrowseGuard {
		daemon: ServiceDaemon::new()?,
	};
	let events = guard.daemon.browse(service_type)?;
	debug!("browsing for '{service_type}'");

	loop {
		let event = events
			.recv_async()
			.await
			.map_err(|_| DiscoveryError::BrowserStopped)?;

		match event {
			ServiceEvent::ServiceResolved(info) => {
				let Some(endpoint) = Endpoint::from_service(&info, service_type) else {
					continue;
				};

				debug!("resolved '{endpoint}'");
				if tx.send(endpoint).is_err() {
					return Ok(());
				}
			}
			ServiceEvent::ServiceRemoved(_, fullname) => debug!("'{fullname}' went away"),
			ServiceEvent::SearchStopped(_) => return Err(DiscoveryError::BrowserStopped),
			ServiceEvent::SearchStarted(_) | ServiceEvent::ServiceFound(_, _) => {}
		}
	}
}
