use std::{
	fs,
	path::{Path, PathBuf},
};

use directories::BaseDirs;
use hl_files::FileAction;
use hl_link::{ServerConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ConfigError;

pub const CONFIG_FILE_NAME: &str = "hostlog.json";

/// Platform data directory for hostlog, eg. `~/.local/share/hostlog` on Linux.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
	BaseDirs::new()
		.map(|dirs| dirs.data_local_dir().join("hostlog"))
		.ok_or(ConfigError::NoDataDir)
}

/// Persisted configuration, stored as `hostlog.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
	/// Config schema version. Files written before versioning read as `0`.
	#[serde(default)]
	pub version: u32,
	#[serde(default)]
	pub host: HostConfig,
	#[serde(default)]
	pub device: DeviceConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
	/// Where received logs are written. Relative paths are resolved against the data directory.
	pub logs_dir: PathBuf,
	pub server: ServerConfig,
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			logs_dir: PathBuf::from("received"),
			server: ServerConfig::default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
	/// Base name of the rotated log files.
	pub file_name: String,
	/// Local directory to also keep the logs in.
	pub local_dir: Option<PathBuf>,
	/// Directory on the host, relative to its logs directory, the records are written to.
	pub host_dir: PathBuf,
	/// Prefix every new file with a device description.
	pub include_device_info: bool,
	pub session: SessionConfig,
}

impl Default for DeviceConfig {
	fn default() -> Self {
		Self {
			file_name: "Logs".to_string(),
			local_dir: None,
			host_dir: PathBuf::from("device"),
			include_device_info: true,
			session: SessionConfig::default(),
		}
	}
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			version: Self::TARGET_VERSION,
			host: HostConfig::default(),
			device: DeviceConfig::default(),
		}
	}
}

impl NodeConfig {
	pub const TARGET_VERSION: u32 = 1;

	pub fn path(data_dir: &Path) -> PathBuf {
		data_dir.join(CONFIG_FILE_NAME)
	}

	/// Loads the config from `data_dir`, migrating it if needed. A missing file is created with
	/// the defaults.
	pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
		let path = Self::path(data_dir);

		let json = match fs::read_to_string(&path) {
			Ok(json) => json,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				warn!("no config found, creating default at '{}'", path.display());
				let config = Self::default();
				config.save(data_dir)?;
				return Ok(config);
			}
			Err(e) => return Err(FileAction::Read.on(&path)(e).into()),
		};

		let mut config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
			path: path.as_path().into(),
			source,
		})?;

		if config.version < Self::TARGET_VERSION {
			info!(
				"migrating config from v{} to v{}",
				config.version,
				Self::TARGET_VERSION
			);
			config.migrate()?;
			config.save(data_dir)?;
		} else if config.version > Self::TARGET_VERSION {
			return Err(ConfigError::UnknownVersion(config.version));
		}

		Ok(config)
	}

	pub fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
		fs::create_dir_all(data_dir).map_err(FileAction::CreateDirectory.on(data_dir))?;

		let path = Self::path(data_dir);
		let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
		fs::write(&path, json).map_err(FileAction::Write.on(&path))?;

		Ok(())
	}

	fn migrate(&mut self) -> Result<(), ConfigError> {
		while self.version < Self::TARGET_VERSION {
			match self.version {
				// unversioned files carry the same fields
				0 => self.version = 1,
				v => return Err(ConfigError::UnknownVersion(v)),
			}
		}

		Ok(())
	}

	/// Directory the host writes received logs into.
	pub fn host_logs_dir(&self, data_dir: &Path) -> PathBuf {
		data_dir.join(&self.host.logs_dir)
	}

	/// Directory the binaries write their own diagnostics into.
	pub fn diagnostics_dir(data_dir: &Path) -> PathBuf {
		data_dir.join("logs")
	}
}
