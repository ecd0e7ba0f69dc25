//! The `run` verb: load the taskfile tree, compile and execute one requested
//! target end to end, per spec.md §6.
//!
//! Grounded on the teacher's `commands/run.rs` top-level shape (resolve
//! config, build a fetcher, hand execution off to a dedicated component),
//! generalized from its `TaskGraph`/`ExecutorRepository` plumbing onto
//! `tasks::load` + `runner::Runner`.

use crate::config::types::{TaskCall, VarValue};
use crate::config::ExecutorOptions;
use crate::fetch::{FetcherRepository, Location, RemotePolicy};
use crate::runner::Runner;
use crate::sigint::setup_global_ctrlc_handler;
use crate::tasks::{self, load, resolve_task, LoadedTaskfile};
use crate::terminal::renderer::OutputRenderer;
use crate::terminal::TERM;
use color_eyre::{eyre::WrapErr, Result};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::error;

/// Run `target`, returning the process exit code to propagate.
///
/// # Errors
///
/// The taskfile tree fails to load (a malformed taskfile, an include cycle,
/// an unresolvable remote include under `--offline`).
pub async fn handle_run_command(options: ExecutorOptions, target: String) -> Result<i32> {
	if let Err(err) = setup_global_ctrlc_handler() {
		error!("failed to install Ctrl-C handler: {:?}", err);
	}
	tasks::fs::ensure_dirs(&options).await?;

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

	if options.summary {
		print_summary(&loaded, &target);
	}

	let (renderer, sink) = OutputRenderer::new(options.output, false);
	let render_thread = std::thread::spawn(move || renderer.drain());

	let mut vars = IndexMap::new();
	if !options.cli_args.is_empty() {
		vars.insert("CLI_ARGS".to_owned(), VarValue::String(options.cli_args.join(" ")));
	}

	let call = TaskCall {
		target,
		vars,
		indirect: false,
		silent: options.silent,
	};

	let runner = Arc::new(Runner::new(loaded, options, sink));
	let code = runner.run_root(call).await;

	drop(runner);
	render_thread.join().expect("renderer thread panicked");

	Ok(code)
}

/// Print the `--summary` block: the target's description, deps, and cmds as
/// declared (pre-compilation — no variables are resolved, matching spec.md
/// §6's "print a task-summary block before execution"). Unresolvable targets
/// are left for the run itself to report.
fn print_summary(loaded: &LoadedTaskfile, target: &str) {
	let Ok((def, _)) = resolve_task(loaded, target) else {
		return;
	};

	println!("{}", TERM.render_title_bar(def.name(), "summary"));
	println!();
	if let Some(description) = def.description() {
		println!("{}", description);
		println!();
	}

	if !def.deps().is_empty() {
		println!("dependencies:");
		for dep in def.deps() {
			println!("  - {}", dep.task);
		}
		println!();
	}

	println!("commands:");
	for cmd in def.cmds() {
		match cmd {
			crate::config::types::Cmd::Simple(cmd) => println!("  - {}", cmd),
			crate::config::types::Cmd::Shell(shell) => println!("  - {}", shell.cmd),
			crate::config::types::Cmd::Call(call) => println!("  - task: {}", call.call.task),
			crate::config::types::Cmd::Defer(defer) => println!("  - defer: {}", describe_cmd(&defer.defer)),
		}
	}
	println!();
}

fn describe_cmd(cmd: &crate::config::types::Cmd) -> String {
	match cmd {
		crate::config::types::Cmd::Simple(cmd) => cmd.clone(),
		crate::config::types::Cmd::Shell(shell) => shell.cmd.clone(),
		crate::config::types::Cmd::Call(call) => format!("task: {}", call.call.task),
		crate::config::types::Cmd::Defer(defer) => describe_cmd(&defer.defer),
	}
}
