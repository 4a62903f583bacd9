use std::path::Path;

use anyhow::{Context as _, Result};
use tracing_appender::{
	non_blocking::WorkerGuard,
	rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "hostlog=info,hl_link=info,hl_node=info,hl_files=warn";

/// Logs to stderr, and to a daily rolling file under `logs_dir` when given. The returned guard
/// flushes the file on drop.
pub fn init(logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

	let (file_layer, guard) = match logs_dir {
		Some(logs_dir) => {
			std::fs::create_dir_all(logs_dir).with_context(|| {
				format!("failed to create logs directory '{}'", logs_dir.display())
			})?;

			let (writer, guard) = tracing_appender::non_blocking(RollingFileAppender::new(
				Rotation::DAILY,
				logs_dir,
				"hostlog.log",
			));

			(
				Some(
					fmt::layer()
						.with_target(true)
						.with_ansi(false)
						.with_writer(writer)
						.boxed(),
				),
				Some(guard),
			)
		}
		None => (None, None),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(
			fmt::layer()
				.with_target(true)
				.with_writer(std::io::stderr),
		)
		.with(file_layer)
		.try_init()
		.context("failed to initialize tracing")?;

	Ok(guard)
}
