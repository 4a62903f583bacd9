use anyhow::Result;
use hl_files::{next_index, resolve_with_index};
use hl_proto::validate_file_name;

use crate::IndexArgs;

pub(crate) fn run(args: IndexArgs) -> Result<()> {
	validate_file_name(&args.file_name)?;

	let last_index = next_index(&args.directory, &args.file_name)?;
	let resolved = resolve_with_index(&args.directory, &args.file_name, last_index, args.new)?;

	println!("latest index: {last_index}");
	println!(
		"next write:   {} ({})",
		resolved.path.display(),
		if resolved.is_new { "new file" } else { "append" }
	);

	Ok(())
}
