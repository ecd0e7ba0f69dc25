#![allow(
	clippy::module_name_repetitions,
	clippy::result_map_unwrap_or_else,
	clippy::wildcard_imports
)]

//! The `task-loop` binary: a thin `clap` front-end over the `task_loop`
//! library, mapping CLI flags 1:1 onto `ExecutorOptions` and dispatching to
//! the `run`/`list`/`clean` commands.
//!
//! Grounded on the teacher's hand-rolled `std::env::args()` verb dispatch in
//! `main.rs`, generalized to `clap` derive since the flag surface needed by
//! `ExecutorOptions` is far wider than a positional loop can comfortably
//! parse.

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use std::path::PathBuf;
use std::time::Duration;
use task_loop::config::types::OutputStyle;
use task_loop::config::ExecutorOptions;
use task_loop::{commands, config, log};
use tracing::error;

#[derive(Parser)]
#[command(
	name = "task-loop",
	version,
	about = "A declarative, YAML driven task runner and execution engine."
)]
struct Cli {
	/// Working directory to resolve the taskfile and cache from.
	#[arg(short = 'd', long, global = true)]
	dir: Option<PathBuf>,

	/// Explicit taskfile path or URL; auto-discovered upward from `--dir` if
	/// omitted.
	#[arg(short = 't', long = "taskfile", global = true)]
	taskfile: Option<String>,

	/// Max concurrent tasks in the cmds phase; 0 (default) means unlimited.
	#[arg(short = 'c', long, global = true)]
	concurrency: Option<usize>,

	/// Print what would run without launching any shells.
	#[arg(long, global = true)]
	dry: bool,

	/// Skip the up-to-date check for the root target only.
	#[arg(long, global = true)]
	force: bool,

	/// Skip the up-to-date check for every task in the run.
	#[arg(long = "force-all", global = true)]
	force_all: bool,

	/// Suppress command banners globally.
	#[arg(long, global = true)]
	silent: bool,

	/// Emit up-to-date notices and other diagnostics.
	#[arg(short = 'v', long, global = true)]
	verbose: bool,

	/// Allow `http://` remote includes.
	#[arg(long, global = true)]
	insecure: bool,

	/// Force a refetch of remote includes.
	#[arg(long, global = true)]
	download: bool,

	/// Forbid network fetches; fail if a remote include isn't cached.
	#[arg(long, global = true)]
	offline: bool,

	/// Auto-approve all prompts.
	#[arg(short = 'y', long = "yes", global = true)]
	assume_yes: bool,

	/// Print a task-summary block before execution.
	#[arg(long, global = true)]
	summary: bool,

	/// Output rendering style; overridden per-task by an explicit `output:`.
	#[arg(long, value_enum, global = true)]
	output: Option<CliOutputStyle>,

	/// Global deadline for the whole run, in seconds.
	#[arg(long, global = true)]
	timeout: Option<u64>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Run a task by name.
	Run {
		/// The task name (or wildcard pattern) to run.
		task: String,
		/// Arguments after `--`, exposed to the task as `CLI_ARGS`.
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		args: Vec<String>,
	},
	/// List every non-internal task.
	List,
	/// Remove the cached remote includes and fingerprints.
	Clean,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliOutputStyle {
	Interleaved,
	Group,
	Prefixed,
	None,
}

impl From<CliOutputStyle> for OutputStyle {
	fn from(value: CliOutputStyle) -> Self {
		match value {
			CliOutputStyle::Interleaved => OutputStyle::Interleaved,
			CliOutputStyle::Group => OutputStyle::Group,
			CliOutputStyle::Prefixed => OutputStyle::Prefixed,
			CliOutputStyle::None => OutputStyle::None,
		}
	}
}

fn build_options(cli: &Cli) -> Result<ExecutorOptions> {
	let dir = match &cli.dir {
		Some(dir) => dir.clone(),
		None => std::env::current_dir()?,
	};

	let mut options = ExecutorOptions::new(dir.clone());
	options.entrypoint = cli.taskfile.clone().or_else(|| {
		config::discover_entrypoint(&dir).map(|path| path.to_string_lossy().into_owned())
	});

	if let Some(concurrency) = cli.concurrency {
		options.concurrency = concurrency;
	}
	options.dry = cli.dry;
	options.force = cli.force;
	options.force_all = cli.force_all;
	options.silent = cli.silent;
	options.verbose = cli.verbose;
	options.insecure = cli.insecure;
	options.download = cli.download;
	options.offline = cli.offline;
	options.assume_yes = cli.assume_yes;
	options.summary = cli.summary;
	if let Some(style) = cli.output {
		options.output = style.into();
	}
	options.timeout = cli.timeout.map(Duration::from_secs);

	Ok(options)
}

fn main() -> Result<()> {
	color_eyre::install()?;
	if let Err(err) = log::initialize_crate_logging(None) {
		error!("failed to initialize logger: {:?}", err);
	}

	let cli = Cli::parse();
	let mut options = build_options(&cli)?;

	let exit_code = match cli.command {
		Command::Run { task, args } => {
			options.cli_args = args;
			async_std::task::block_on(commands::run::handle_run_command(options, task))?
		}
		Command::List => {
			async_std::task::block_on(commands::list::handle_list_command(options))?;
			0
		}
		Command::Clean => async_std::task::block_on(commands::clean::handle_clean_command(&options))?,
	};

	std::process::exit(exit_code);
}
