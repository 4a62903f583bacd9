use std::collections::HashMap;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tracing::{debug, info, warn};

use crate::DiscoveryError;

/// Publishes a listener over mDNS for as long as it is alive.
pub struct Advertiser {
	daemon: ServiceDaemon,
	fullname: String,
}

impl Advertiser {
	/// Registers `instance_name` under `service_type`, announcing every local interface address.
	pub fn register(
		service_type: &str,
		instance_name: &str,
		port: u16,
	) -> Result<Self, DiscoveryError> {
		let daemon = ServiceDaemon::new()?;
		let service = ServiceInfo::new(
			service_type,
			instance_name,
			&format!("{instance_name}.local."),
			"",
			port,
			None::<HashMap<String, String>>,
		)?
		.enable_addr_auto();
		let fullname = service.get_fullname().to_string();

		daemon.register(service)?;
		info!("advertising '{fullname}' on port {port}");

		Ok(Self { daemon, fullname })
	}

	pub fn fullname(&self) -> &str {
		&self.fullname
	}
}

impl Drop for Advertiser {
	fn drop(&mut self) {
		debug!("withdrawing mdns advertisement '{}'", self.fullname);
		if let Err(e) = self.daemon.unregister(&self.fullname) {
			warn!("error unregistering mdns service '{}': {e}", self.fullname);
		}
		if let Err(e) = self.daemon.shutdown() {
			warn!("error shutting down mdns daemon: {e}");
		}
	}
}
