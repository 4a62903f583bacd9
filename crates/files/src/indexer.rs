use std::{
	fs, io,
	path::{Path, PathBuf},
};

use hl_proto::ROTATION_DELIMITER;

use crate::{FileAction, IndexError};

pub const LOG_EXTENSION: &str = "log";

/// Rotation indexes start at one.
pub const FIRST_INDEX: u64 = 1;

/// Where a record for a given stream should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
	pub path: PathBuf,
	pub index: u64,
	/// `true` when nothing exists at `path` yet, so a header may be written first.
	pub is_new: bool,
}

/// Name of the log file with the given rotation index.
pub fn log_file_name(prefix: &str, index: u64) -> String {
	format!("{prefix}{ROTATION_DELIMITER}{index}.{LOG_EXTENSION}")
}

pub fn log_file_path(directory: impl AsRef<Path>, prefix: &str, index: u64) -> PathBuf {
	directory.as_ref().join(log_file_name(prefix, index))
}

/// Extracts the rotation index from a directory entry name.
///
/// Only `<prefix>_<digits>...` counts: the digits must directly follow the delimiter and the run
/// stops at the first non digit, so `App_12.log` is 12 while `App-5.log` and `App_x1.log` are `None`.
pub fn parse_index(entry_name: &str, prefix: &str) -> Option<u64> {
	let rest = entry_name
		.strip_prefix(prefix)?
		.strip_prefix(ROTATION_DELIMITER)?;
	let digits = rest.bytes().take_while(u8::is_ascii_digit).count();

	rest[..digits].parse().ok()
}

/// The highest rotation index present in `directory` for `prefix`.
///
/// Returns [`FIRST_INDEX`] when no entry matches or the directory does not exist.
pub fn next_index(directory: impl AsRef<Path>, prefix: &str) -> Result<u64, IndexError> {
	let directory = directory.as_ref();

	let entries = match fs::read_dir(directory) {
		Ok(entries) => entries,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(FIRST_INDEX),
		Err(e) => {
			return Err(FileAction::ListDirectory.on(directory)(e).into());
		}
	};

	let mut last_index = FIRST_INDEX;
	for entry in entries {
		let entry = entry.map_err(FileAction::ListDirectory.on(directory))?;

		if let Some(index) = entry
			.file_name()
			.to_str()
			.and_then(|name| parse_index(name, prefix))
		{
			last_index = last_index.max(index);
		}
	}

	Ok(last_index)
}

/// Picks the file a record should go to.
///
/// With `create_new` the result is always one past the highest existing index, or
/// [`IndexError::Exhausted`] when there is none. Otherwise the highest indexed file is reused when
/// it exists; if it does not, the write falls back to index 1.
pub fn resolve_path(
	directory: impl AsRef<Path>,
	prefix: &str,
	create_new: bool,
) -> Result<ResolvedPath, IndexError> {
	let directory = directory.as_ref();
	resolve_with_index(directory, prefix, next_index(directory, prefix)?, create_new)
}

/// Same as [`resolve_path`] for an already computed highest index.
pub fn resolve_with_index(
	directory: &Path,
	prefix: &str,
	last_index: u64,
	create_new: bool,
) -> Result<ResolvedPath, IndexError> {
	let index = if create_new {
		last_index
			.checked_add(1)
			.ok_or_else(|| IndexError::Exhausted {
				prefix: prefix.to_string(),
				last_index,
			})?
	} else if log_file_path(directory, prefix, last_index).is_file() {
		last_index
	} else {
		FIRST_INDEX
	};

	let path = log_file_path(directory, prefix, index);
	Ok(ResolvedPath {
		is_new: !path.exists(),
		path,
		index,
	})
}
