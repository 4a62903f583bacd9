use anyhow::Result;

use crate::context::Context;

pub(crate) fn run(ctx: &Context) -> Result<()> {
	println!("# {}", ctx.data_dir.display());
	println!("{}", serde_json::to_string_pretty(&ctx.config)?);
	Ok(())
}
