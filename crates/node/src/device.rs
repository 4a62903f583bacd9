use std::{
	env::consts::{ARCH, OS},
	path::{Path, PathBuf},
	sync::Arc,
};

use hl_files::{LogWriter, WriteError};
use hl_link::SyncSession;
use hl_proto::{validate_file_name, InvalidFileName, LogRecord};
use tracing::debug;

/// Supplies the header written at the top of every new log file.
pub trait DeviceInfoProvider: Send + Sync {
	fn device_info(&self) -> String;
}

impl<F> DeviceInfoProvider for F
where
	F: Fn() -> String + Send + Sync,
{
	fn device_info(&self) -> String {
		self()
	}
}

/// Describes the machine the process runs on.
#[derive(Debug, Clone, Default)]
pub struct SystemInfo {
	pub app_version: Option<String>,
}

impl DeviceInfoProvider for SystemInfo {
	fn device_info(&self) -> String {
		let separator = "*".repeat(22);
		format!(
			"{separator}\nSystem={OS}\nArch={ARCH}\nAppVersion={}\n{separator}\n",
			self.app_version.as_deref().unwrap_or("Unknown")
		)
	}
}

/// What an app logs through.
///
/// Every line goes to the latest local file (when a local directory is set) and to the host (when a
/// session is attached). The local and host sides index their files independently.
pub struct DeviceLogger {
	file_name: String,
	local_dir: Option<PathBuf>,
	host: Option<(PathBuf, SyncSession)>,
	device_info: Option<Arc<dyn DeviceInfoProvider>>,
	writer: LogWriter,
}

impl DeviceLogger {
	pub fn new(file_name: impl Into<String>) -> Result<Self, InvalidFileName> {
		let file_name = file_name.into();
		validate_file_name(&file_name)?;

		Ok(Self {
			file_name,
			local_dir: None,
			host: None,
			device_info: None,
			writer: LogWriter::new(),
		})
	}

	#[must_use]
	pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.local_dir = Some(dir.into());
		self
	}

	/// Forwards every line over `session`, into `host_dir` on the host.
	#[must_use]
	pub fn with_host(mut self, host_dir: impl Into<PathBuf>, session: SyncSession) -> Self {
		self.host = Some((host_dir.into(), session));
		self
	}

	#[must_use]
	pub fn with_device_info(mut self, provider: impl DeviceInfoProvider + 'static) -> Self {
		self.device_info = Some(Arc::new(provider));
		self
	}

	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	pub fn session(&self) -> Option<&SyncSession> {
		self.host.as_ref().map(|(_, session)| session)
	}

	/// Appends `message` as one line. The host copy is best effort and never fails; only the local
	/// write reports errors.
	pub fn log(&self, message: &str) -> Result<(), WriteError> {
		let line = if message.ends_with('\n') {
			message.to_string()
		} else {
			format!("{message}\n")
		};

		self.dispatch(|path, file_name| LogRecord::append(path, file_name, line.as_str()))
	}

	/// Starts a new file on both sides, headed by the device info when enabled.
	pub fn start_new_session(&self) -> Result<(), WriteError> {
		debug!("starting a new '{}' session", self.file_name);
		self.dispatch(|path, file_name| LogRecord::new_session(path, file_name))
	}

	/// Detaches from the host.
	pub async fn shutdown(self) {
		if let Some((_, session)) = self.host {
			session.shutdown().await;
		}
	}

	fn dispatch(&self, make: impl Fn(String, String) -> LogRecord) -> Result<(), WriteError> {
		let device_info = self.device_info.as_ref().map(|provider| provider.device_info());
		let record = |dir: &Path| {
			make(
				dir.join(&self.file_name).to_string_lossy().into_owned(),
				self.file_name.clone(),
			)
			.with_device_info(device_info.clone())
		};

		if let Some((host_dir, session)) = &self.host {
			session.send_record(record(host_dir));
		}

		if let Some(local_dir) = &self.local_dir {
			self.writer.write(&record(local_dir))?;
		}

		Ok(())
	}
}
