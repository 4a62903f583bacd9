use std::path::Path;

use hl_files::FileIOError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("could not determine a data directory for this platform")]
	NoDataDir,
	#[error(transparent)]
	Io(#[from] FileIOError),
	#[error("failed to parse config file '{}': {source}", path.display())]
	Parse {
		path: Box<Path>,
		#[source]
		source: serde_json::Error,
	},
	#[error("failed to serialize config: {0}")]
	Serialize(#[source] serde_json::Error),
	#[error("config version {0} is newer than this build supports")]
	UnknownVersion(u32),
}
