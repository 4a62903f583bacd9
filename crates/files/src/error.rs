use std::{
	fmt, io,
	path::{Path, PathBuf},
};

use hl_proto::InvalidFileName;
use thiserror::Error;

/// What was being done to a log or config file when the filesystem refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
	ListDirectory,
	CreateDirectory,
	Open,
	Read,
	Write,
}

impl FileAction {
	/// Adapter for `map_err` which attaches this action and `path` to an `io::Error`.
	pub fn on(self, path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> FileIOError {
		let path = path.as_ref().to_path_buf();
		move |source| FileIOError {
			action: self,
			path,
			source,
		}
	}
}

impl fmt::Display for FileAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::ListDirectory => "list directory",
			Self::CreateDirectory => "create directory",
			Self::Open => "open",
			Self::Read => "read",
			Self::Write => "write to",
		})
	}
}

#[derive(Debug, Error)]
#[error("failed to {action} '{}': {source}", .path.display())]
pub struct FileIOError {
	pub action: FileAction,
	pub path: PathBuf,
	#[source]
	pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum IndexError {
	/// The directory exists but could not be listed. Callers treat this as "no existing files".
	#[error("log directory is unreadable: {0}")]
	DirectoryUnreadable(#[from] FileIOError),
	/// A new file was requested but the highest index already in use is `u64::MAX`.
	#[error("no index left after '{prefix}_{last_index}'")]
	Exhausted { prefix: String, last_index: u64 },
}

#[derive(Debug, Error)]
pub enum WriteError {
	#[error(transparent)]
	InvalidFileName(#[from] InvalidFileName),
	#[error("log path '{0}' points outside of the logs directory")]
	PathOutsideRoot(String),
	#[error("could not save log to file: {0}")]
	CouldNotSaveToFile(#[from] FileIOError),
	#[error(transparent)]
	Index(#[from] IndexError),
}

impl WriteError {
	/// Short description suitable for showing to a user.
	pub fn message(&self) -> &'static str {
		match self {
			Self::InvalidFileName(_) | Self::PathOutsideRoot(_) => {
				"The log record does not describe a valid log file"
			}
			Self::CouldNotSaveToFile(_) | Self::Index(_) => "There was an error trying to save the log file",
		}
	}
}
