use std::{
	fs::{self, OpenOptions},
	io::Write,
	path::{Component, Path, PathBuf},
};

use hl_proto::LogRecord;
use tracing::{trace, warn};

use crate::{next_index, resolve_with_index, FileAction, ResolvedPath, WriteError, FIRST_INDEX};

/// Applies [`LogRecord`]s to the filesystem.
///
/// A record whose target file is new gets its `device_info` header followed by the message. An
/// existing file only ever gets the message appended, files are never truncated.
#[derive(Debug, Clone, Default)]
pub struct LogWriter {
	root: Option<PathBuf>,
}

impl LogWriter {
	/// A writer which uses record paths exactly as sent.
	pub fn new() -> Self {
		Self::default()
	}

	/// A writer which places every record below `root`, whatever its `path` says.
	pub fn confined_to(root: impl Into<PathBuf>) -> Self {
		Self {
			root: Some(root.into()),
		}
	}

	pub fn root(&self) -> Option<&Path> {
		self.root.as_deref()
	}

	/// Directory in which the record's rotated files live.
	pub fn directory_for(&self, record: &LogRecord) -> Result<PathBuf, WriteError> {
		let base = match &self.root {
			Some(root) => confine(root, &record.path)?,
			None => PathBuf::from(&record.path),
		};

		if self.root.as_deref() == Some(base.as_path()) {
			return Ok(base);
		}

		Ok(match base.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => self.root.clone().unwrap_or_else(|| PathBuf::from(".")),
		})
	}

	pub fn write(&self, record: &LogRecord) -> Result<ResolvedPath, WriteError> {
		record.validate()?;

		let directory = self.directory_for(record)?;
		let last_index = next_index(&directory, &record.file_name).unwrap_or_else(|e| {
			warn!("treating log directory as empty: {e}");
			FIRST_INDEX
		});
		let resolved = resolve_with_index(
			&directory,
			&record.file_name,
			last_index,
			record.create_new_file,
		)?;

		fs::create_dir_all(&directory).map_err(FileAction::CreateDirectory.on(&directory))?;

		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&resolved.path)
			.map_err(FileAction::Open.on(&resolved.path))?;

		if resolved.is_new {
			if let Some(device_info) = &record.device_info {
				file.write_all(device_info.as_bytes())
					.map_err(FileAction::Write.on(&resolved.path))?;
			}
		}

		file.write_all(record.message.as_bytes())
			.map_err(FileAction::Write.on(&resolved.path))?;

		trace!(
			"wrote {} bytes to '{}'",
			record.message.len(),
			resolved.path.display()
		);

		Ok(resolved)
	}
}

/// Joins the normal components of `path` onto `root`. Parent components are rejected rather than
/// resolved so a record can never leave `root`.
fn confine(root: &Path, path: &str) -> Result<PathBuf, WriteError> {
	let mut confined = root.to_path_buf();
	for component in Path::new(path).components() {
		match component {
			Component::Normal(part) => confined.push(part),
			Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
			Component::ParentDir => return Err(WriteError::PathOutsideRoot(path.to_string())),
		}
	}

	Ok(confined)
}
