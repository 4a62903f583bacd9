use std::path::PathBuf;

use anyhow::Result;
use hl_node::{default_data_dir, NodeConfig};

/// What every command but `index` runs with: the data directory and the config loaded from it.
pub struct Context {
	pub data_dir: PathBuf,
	pub config: NodeConfig,
}

impl Context {
	pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
		let data_dir = resolve_data_dir(data_dir)?;
		let config = NodeConfig::load(&data_dir)?;

		Ok(Self { data_dir, config })
	}
}

/// The `--data-dir` override, or the platform default.
pub fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
	match data_dir {
		Some(data_dir) => Ok(data_dir),
		None => Ok(default_data_dir()?),
	}
}
