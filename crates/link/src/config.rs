use std::{
	net::{Ipv4Addr, SocketAddr},
	time::Duration,
};

use hl_proto::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};

use crate::SERVICE_TYPE;

/// Settings shared by every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
	/// Idle time before TCP keepalive probes start.
	pub keepalive_idle_secs: u64,
	/// Pause before redialing after the peer aborted the connection.
	pub reconnect_delay_ms: u64,
	/// Frames larger than this are a protocol error and end the connection.
	pub max_frame_len: usize,
}

impl TransportConfig {
	pub fn keepalive_idle(&self) -> Duration {
		Duration::from_secs(self.keepalive_idle_secs)
	}

	pub fn reconnect_delay(&self) -> Duration {
		Duration::from_millis(self.reconnect_delay_ms)
	}
}

impl Default for TransportConfig {
	fn default() -> Self {
		Self {
			keepalive_idle_secs: 2,
			reconnect_delay_ms: 250,
			max_frame_len: DEFAULT_MAX_FRAME_LEN,
		}
	}
}

/// Host side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	/// Port `0` picks a free port every time the listener is (re)built.
	pub bind_addr: SocketAddr,
	/// Publish the listener over mDNS. Disabled in tests.
	pub advertise: bool,
	pub instance_name: String,
	pub service_type: String,
	/// Pause before rebuilding a failed listener.
	pub listener_retry_delay_ms: u64,
	pub transport: TransportConfig,
}

impl ServerConfig {
	pub fn listener_retry_delay(&self) -> Duration {
		Duration::from_millis(self.listener_retry_delay_ms)
	}
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
			advertise: true,
			instance_name: "hostlog".to_string(),
			service_type: SERVICE_TYPE.to_string(),
			listener_retry_delay_ms: 1000,
			transport: TransportConfig::default(),
		}
	}
}

/// Device side settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
	pub service_type: String,
	/// Pause before restarting a failed mDNS browser.
	pub browse_restart_delay_ms: u64,
	pub transport: TransportConfig,
}

impl SessionConfig {
	pub fn browse_restart_delay(&self) -> Duration {
		Duration::from_millis(self.browse_restart_delay_ms)
	}
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			service_type: SERVICE_TYPE.to_string(),
			browse_restart_delay_ms: 1000,
			transport: TransportConfig::default(),
		}
	}
}
