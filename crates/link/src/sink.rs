use async_trait::async_trait;
use hl_files::LogWriter;
use hl_proto::LogRecord;
use tokio::{sync::mpsc, task::spawn_blocking};
use tracing::{error, trace, warn};

/// Where a [`crate::Transport`] delivers the records it receives.
#[async_trait]
pub trait RecordSink: Send + Sync + 'static {
	async fn on_record(&self, record: LogRecord);
}

/// Persists every record. Write failures are logged and never retried.
#[async_trait]
impl RecordSink for LogWriter {
	async fn on_record(&self, record: LogRecord) {
		let writer = self.clone();
		let file_name = record.file_name.clone();

		match spawn_blocking(move || writer.write(&record)).await {
			Ok(Ok(resolved)) => trace!(
				"wrote '{file_name}' record to '{}'",
				resolved.path.display()
			),
			Ok(Err(e)) => warn!("{}: {e}", e.message()),
			Err(e) => error!("log writer task failed: {e}"),
		}
	}
}

#[async_trait]
impl RecordSink for mpsc::UnboundedSender<LogRecord> {
	async fn on_record(&self, record: LogRecord) {
		if self.send(record).is_err() {
			trace!("record receiver is gone, dropping record");
		}
	}
}

/// Drops everything, for peers that only ever send.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

#[async_trait]
impl RecordSink for Discard {
	async fn on_record(&self, record: LogRecord) {
		trace!("discarding record for '{}'", record.file_name);
	}
}
