use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result};
use hl_link::{Discard, Endpoint, LinkStatus, SyncSession, TcpConnector};
use hl_node::{DeviceLogger, SystemInfo};
use tokio::{
	io::{stdin, AsyncBufReadExt, BufReader},
	signal::ctrl_c,
	sync::mpsc,
	time::sleep,
};
use tracing::{info, warn};

use crate::{context::Context, DeviceArgs};

pub(crate) async fn run(mut ctx: Context, args: DeviceArgs) -> Result<()> {
	let device = &mut ctx.config.device;
	if let Some(file_name) = args.file_name {
		device.file_name = file_name;
	}
	if let Some(local_dir) = args.local_dir {
		device.local_dir = Some(local_dir);
	}
	if let Some(host_dir) = args.host_dir {
		device.host_dir = host_dir;
	}
	if args.no_device_info {
		device.include_device_info = false;
	}
	let device = ctx.config.device;

	let session = match args.connect {
		Some(addr) => {
			let (endpoints_tx, endpoints) = mpsc::unbounded_channel();
			endpoints_tx.send(Endpoint::new(addr.to_string(), vec![addr]))?;
			SyncSession::with_endpoints(
				device.session.clone(),
				endpoints,
				Arc::new(TcpConnector::new(device.session.transport.keepalive_idle())),
				Arc::new(Discard),
			)
		}
		None => SyncSession::start(device.session.clone(), Arc::new(Discard)),
	};

	info!("waiting for a host");
	let mut status = session.status();
	tokio::select! {
		_ = ctrl_c() => {
			session.shutdown().await;
			return Ok(());
		}
		ready = status.wait_for(LinkStatus::is_ready) => {
			ready.context("sync session stopped before connecting")?;
		}
	}

	let mut logger = DeviceLogger::new(&device.file_name)?.with_host(&device.host_dir, session);
	if let Some(local_dir) = &device.local_dir {
		logger = logger.with_local_dir(local_dir);
	}
	if device.include_device_info {
		logger = logger.with_device_info(SystemInfo {
			app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
		});
	}

	if args.new_session {
		logger.start_new_session()?;
	}

	let mut lines = BufReader::new(stdin()).lines();
	loop {
		tokio::select! {
			_ = ctrl_c() => break,
			line = lines.next_line() => match line? {
				Some(line) => {
					if let Err(e) = logger.log(&line) {
						warn!("{}: {e}", e.message());
					}
				}
				None => break,
			},
		}
	}

	sleep(Duration::from_millis(args.linger_ms)).await;
	logger.shutdown().await;

	Ok(())
}
