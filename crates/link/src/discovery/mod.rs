use std::{fmt, net::SocketAddr};

use mdns_sd::ServiceInfo;

mod advertiser;
mod browser;

pub use advertiser::*;
pub use browser::*;

/// DNS-SD service type shared by the advertising host and the browsing device.
pub const SERVICE_TYPE: &str = "_hostlog._tcp.local.";

/// A resolved host a [`crate::Transport`] can dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	pub service_name: String,
	/// Every address the service resolved to, IPv4 first.
	pub addrs: Vec<SocketAddr>,
}

impl Endpoint {
	pub fn new(service_name: impl Into<String>, addrs: Vec<SocketAddr>) -> Self {
		Self {
			service_name: service_name.into(),
			addrs,
		}
	}

	/// Returns `None` for records of another service type or without any address.
	pub fn from_service(info: &ServiceInfo, service_type: &str) -> Option<Self> {
		if info.get_type() != service_type {
			return None;
		}

		let port = info.get_port();
		let mut addrs = info
			.get_addresses()
			.iter()
			.map(|addr| SocketAddr::new((*addr).into(), port))
			.collect::<Vec<_>>();
		if addrs.is_empty() {
			return None;
		}
		addrs.sort_by_key(|addr| (addr.is_ipv6(), *addr));

		Some(Self::new(info.get_fullname(), addrs))
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.addrs.first() {
			Some(addr) => write!(f, "{} ({addr})", self.service_name),
			None => write!(f, "{}", self.service_name),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{collections::HashMap, net::Ipv4Addr};

	use super::*;

	#[test]
	fn display_uses_the_preferred_address() {
		let endpoint = Endpoint::new(
			"desk._hostlog._tcp.local.",
			vec![SocketAddr::from((Ipv4Addr::LOCALHOST, 4000))],
		);
		assert_eq!(
			endpoint.to_string(),
			"desk._hostlog._tcp.local. (127.0.0.1:4000)"
		);
	}

	#[test]
	fn resolved_service_becomes_an_endpoint() {
		let info = ServiceInfo::new(
			SERVICE_TYPE,
			"desk",
			"desk.local.",
			"127.0.0.1,10.0.0.2",
			4000,
			None::<HashMap<String, String>>,
		)
		.unwrap();

		let endpoint = Endpoint::from_service(&info, SERVICE_TYPE).unwrap();
		assert_eq!(endpoint.service_name, "desk._hostlog._tcp.local.");
		assert_eq!(
			endpoint.addrs.first(),
			Some(&SocketAddr::from((Ipv4Addr::new(10, 0, 0, 2), 4000)))
		);
		assert_eq!(endpoint.addrs.len(), 2);

		assert!(Endpoint::from_service(&info, "_other._tcp.local.").is_none());
	}
}
