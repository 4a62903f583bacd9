use std::{net::SocketAddr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use hl_node::NodeConfig;

mod commands;
mod context;
mod logging;

use context::Context;

#[derive(Parser, Debug)]
#[command(name = "hostlog", about = "Stream app logs from a device to this machine", version)]
struct Cli {
	/// Path to the hostlog data directory
	#[arg(long, env = "HOSTLOG_DATA_DIR", global = true)]
	data_dir: Option<PathBuf>,

	/// Only log diagnostics to stderr, not to the data directory
	#[arg(long, global = true, default_value_t = false)]
	no_log_file: bool,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Accept a device and write the logs it sends
	Host(HostArgs),
	/// Forward lines read from stdin to a host
	Device(DeviceArgs),
	/// Show which file the next write to a log stream goes to
	Index(IndexArgs),
	/// Print the effective configuration
	Config,
}

#[derive(Parser, Debug, Clone)]
struct HostArgs {
	/// Address to listen on
	#[arg(long)]
	bind: Option<SocketAddr>,
	/// Directory received logs are written below
	#[arg(long)]
	logs_dir: Option<PathBuf>,
	/// mDNS instance name to advertise
	#[arg(long)]
	name: Option<String>,
	/// Do not advertise over mDNS
	#[arg(long, default_value_t = false)]
	no_advertise: bool,
}

#[derive(Parser, Debug, Clone)]
struct DeviceArgs {
	/// Base name of the log files
	#[arg(long)]
	file_name: Option<String>,
	/// Also keep the logs in this local directory
	#[arg(long)]
	local_dir: Option<PathBuf>,
	/// Directory on the host the logs go to
	#[arg(long)]
	host_dir: Option<PathBuf>,
	/// Dial this host directly instead of browsing for one
	#[arg(long)]
	connect: Option<SocketAddr>,
	/// Start a new log file before forwarding
	#[arg(long, default_value_t = false)]
	new_session: bool,
	/// Do not head new files with a device description
	#[arg(long, default_value_t = false)]
	no_device_info: bool,
	/// Time given to queued lines to reach the host after stdin closes
	#[arg(long, default_value_t = 250)]
	linger_ms: u64,
}

#[derive(Parser, Debug, Clone)]
struct IndexArgs {
	/// Directory holding the rotated files
	directory: PathBuf,
	/// Base name of the log files
	file_name: String,
	/// Resolve as if starting a new session
	#[arg(long, default_value_t = false)]
	new: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	// before any config is loaded so its warnings are not lost
	let _guard = logging::init(log_file_dir(&cli)?.as_deref())?;

	match cli.command {
		Commands::Host(args) => commands::host::run(Context::load(cli.data_dir)?, args).await,
		Commands::Device(args) => commands::device::run(Context::load(cli.data_dir)?, args).await,
		Commands::Index(args) => commands::index::run(args),
		Commands::Config => commands::config::run(&Context::load(cli.data_dir)?),
	}
}

/// Where diagnostics go besides stderr. Only the long running commands keep a log file.
fn log_file_dir(cli: &Cli) -> Result<Option<PathBuf>> {
	if cli.no_log_file || !matches!(cli.command, Commands::Host(_) | Commands::Device(_)) {
		return Ok(None);
	}

	let data_dir = context::resolve_data_dir(cli.data_dir.clone())?;
	Ok(Some(NodeConfig::diagnostics_dir(&data_dir)))
}
