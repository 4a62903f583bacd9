use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separates the base file name from its rotation index, eg. `MyApp_3.log`.
pub const ROTATION_DELIMITER: char = '_';

/// A single log write sent from the device to the host.
///
/// `path` and `file_name` identify the log stream. `path` is `<directory>/<file_name>`, so the
/// physical file is `<directory>/<file_name>_<index>.log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
	pub path: String,
	pub file_name: String,
	/// Pre-formatted text to append. Empty when the record only marks a session boundary.
	pub message: String,
	/// Header written at the top of a file, only when the record creates that file.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub device_info: Option<String>,
	/// Forces a new rotation index instead of appending to the latest file.
	#[serde(default)]
	pub create_new_file: bool,
}

impl LogRecord {
	/// A record appending `message` to the most recent file of the stream.
	pub fn append(
		path: impl Into<String>,
		file_name: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			path: path.into(),
			file_name: file_name.into(),
			message: message.into(),
			device_info: None,
			create_new_file: false,
		}
	}

	/// A record which starts a new session file for the stream.
	pub fn new_session(path: impl Into<String>, file_name: impl Into<String>) -> Self {
		Self {
			create_new_file: true,
			..Self::append(path, file_name, "")
		}
	}

	#[must_use]
	pub fn with_device_info(mut self, device_info: Option<String>) -> Self {
		self.device_info = device_info;
		self
	}

	pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}

	pub fn from_json(bytes: &[u8]) -> Result<Self, MalformedMessage> {
		serde_json::from_slice(bytes).map_err(MalformedMessage)
	}

	pub fn validate(&self) -> Result<(), InvalidFileName> {
		validate_file_name(&self.file_name)
	}
}

/// Inbound bytes which could not be decoded as a [`LogRecord`].
#[derive(Debug, Error)]
#[error("malformed log record: {0}")]
pub struct MalformedMessage(#[source] pub serde_json::Error);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidFileName {
	#[error("log file name is empty")]
	Empty,
	#[error("log file name '{0}' contains a path separator")]
	PathSeparator(String),
	#[error("log file name '{0}' contains a rotation delimiter followed by digits")]
	AmbiguousDelimiter(String),
}

/// Checks that `name` can be used as the base of rotated log file names.
///
/// A name like `App_2` would make `App_2_5.log` parse as index 2 of `App`, so any delimiter
/// directly followed by a digit is rejected.
pub fn validate_file_name(name: &str) -> Result<(), InvalidFileName> {
	if name.is_empty() {
		return Err(InvalidFileName::Empty);
	}

	if name.contains(['/', '\\']) {
		return Err(InvalidFileName::PathSeparator(name.to_string()));
	}

	let mut chars = name.chars().peekable();
	while let Some(c) = chars.next() {
		if c == ROTATION_DELIMITER && chars.peek().is_some_and(char::is_ascii_digit) {
			return Err(InvalidFileName::AmbiguousDelimiter(name.to_string()));
		}
	}

	Ok(())
}
