//! The `list` command: renders every non-internal task and its description,
//! for user-facing consumption at a TTY.
//!
//! Grounded on the teacher's `commands/list.rs` use of `terminal::TERM` and
//! `Term::render_list_section`, generalized from iterating the teacher's
//! preset/tag structures onto the merged `LoadedTaskfile` task map.

use crate::config::ExecutorOptions;
use crate::fetch::{FetcherRepository, Location, RemotePolicy};
use crate::tasks::load;
use crate::terminal::TERM;
use color_eyre::{eyre::WrapErr, Result};

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// List every non-internal task defined (directly or via `include:`) in the
/// resolved taskfile tree.
///
/// # Errors
///
/// The taskfile tree fails to load.
pub async fn handle_list_command(options: ExecutorOptions) -> Result<()> {
	let entrypoint = options
		.entrypoint
		.clone()
		.unwrap_or_else(|| "Taskfile.yml".to_owned());

	let fetcher = FetcherRepository::new(
		options.dir.clone(),
		options.cache_root.clone(),
		RemotePolicy {
			insecure: options.insecure,
			download: options.download,
			offline: options.offline,
			assume_yes: options.assume_yes,
		},
	);

	let loaded = load(&fetcher, Location::parse(&entrypoint), options.dir.clone())
		.await
		.wrap_err("failed to load taskfile")?;

	let mut entries: Vec<(String, String)> = loaded
		.tasks
		.values()
		.filter(|task| !task.is_internal())
		.map(|task| {
			let mut label = task.name().to_owned();
			if !task.aliases().is_empty() {
				label += &format!(" ({})", task.aliases().join(", "));
			}
			(label, task.description().unwrap_or("").to_owned())
		})
		.collect();
	entries.sort_by(|a, b| a.0.cmp(&b.0));

	println!(
		"{}",
		TERM.render_title_bar("task-loop", VERSION.unwrap_or("dev"))
	);
	println!();
	print!("{}", TERM.render_list_section("Tasks", &entries));

	Ok(())
}
