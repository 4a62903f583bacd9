use anyhow::Result;
use hl_link::LinkStatus;
use hl_node::HostNode;
use tokio::signal::ctrl_c;
use tracing::info;

use crate::{context::Context, HostArgs};

pub(crate) async fn run(mut ctx: Context, args: HostArgs) -> Result<()> {
	let host = &mut ctx.config.host;
	if let Some(bind) = args.bind {
		host.server.bind_addr = bind;
	}
	if let Some(logs_dir) = args.logs_dir {
		host.logs_dir = logs_dir;
	}
	if let Some(name) = args.name {
		host.server.instance_name = name;
	}
	if args.no_advertise {
		host.server.advertise = false;
	}

	let node = HostNode::start(&ctx.config, &ctx.data_dir).await?;
	if let Some(addr) = *node.local_addr().borrow() {
		println!("listening on {addr}");
	}

	let mut status = node.status();
	loop {
		tokio::select! {
			_ = ctrl_c() => break,
			changed = status.changed() => {
				if changed.is_err() {
					break;
				}

				match &*status.borrow_and_update() {
					LinkStatus::Disconnected => info!("waiting for a device"),
					LinkStatus::Connection { peer, state, .. } => info!("device '{peer}': {state:?}"),
				}
			}
		}
	}

	info!("shutting down");
	node.shutdown().await;

	Ok(())
}
