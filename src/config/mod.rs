//! Executor-wide configuration: the options table from spec.md §6, plus the
//! root-taskfile auto-discovery walk used when no `--entrypoint` is given.
//!
//! Grounded on the teacher's `config/mod.rs::get_project_root()` walk-up
//! pattern (same `while current_dir.as_os_str() != "/"` loop shape), adapted
//! from looking for a fixed `.dl/config.yml` to probing an ordered list of
//! candidate taskfile names per entry.

use crate::config::types::OutputStyle;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;

/// Candidate root-taskfile names, probed in this order, per spec.md §6.
pub const CANDIDATE_ENTRYPOINTS: &[&str] = &[
	"Taskfile.yml",
	"Taskfile.yaml",
	"Taskfile.dist.yml",
	"Taskfile.dist.yaml",
];

/// Walk upward from `start` looking for the first directory containing one
/// of `CANDIDATE_ENTRYPOINTS`. Returns the matched file's full path.
#[must_use]
pub fn discover_entrypoint(start: &Path) -> Option<PathBuf> {
	let mut current = start.to_path_buf();
	loop {
		for candidate in CANDIDATE_ENTRYPOINTS {
			let found = current.join(candidate);
			if found.is_file() {
				return Some(found);
			}
		}

		if !current.pop() {
			return None;
		}
	}
}

/// Executor-wide options, mirroring spec.md §6's configuration table.
/// Assembled once at CLI startup and threaded through Loader/Compiler/
/// Scheduler construction.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
	/// Working directory the Loader uses to locate the root taskfile.
	pub dir: PathBuf,
	/// Explicit path/URL to the root taskfile; `None` triggers auto-discovery.
	pub entrypoint: Option<String>,
	/// Base cache directory handed to `FetcherRepository`, which appends its
	/// own `remote/` subdirectory beneath it.
	pub cache_root: PathBuf,
	/// `cache_root.join("remote")`; only used to pre-create the directory
	/// before a run (`tasks::fs::ensure_dirs`).
	pub temp_dir_remote: PathBuf,
	/// Directory passed directly to `FingerprintStore`; already
	/// `cache_root.join("checksum")`.
	pub temp_dir_fingerprint: PathBuf,
	/// Suppress command banners globally.
	pub silent: bool,
	/// Emit up-to-date notices and other diagnostics.
	pub verbose: bool,
	/// Do not launch shells; do not write fingerprints.
	pub dry: bool,
	/// Skip the up-to-date check for the root target only.
	pub force: bool,
	/// Skip the up-to-date check for every task in the run.
	pub force_all: bool,
	/// Max concurrent tasks in the cmds phase; `0` means unlimited.
	pub concurrency: usize,
	/// Allow `http://` remote includes.
	pub insecure: bool,
	/// Force a refetch of remote includes.
	pub download: bool,
	/// Forbid network fetches; fail if a remote include isn't cached.
	pub offline: bool,
	/// Auto-approve all prompts.
	pub assume_yes: bool,
	/// Print a task-summary block before execution.
	pub summary: bool,
	/// Default output style, overridden per-task by an explicit `output:`.
	pub output: OutputStyle,
	/// Global deadline for the whole run.
	pub timeout: Option<Duration>,
	/// Enforce the taskfile schema-version floor on load.
	pub version_check: bool,
	/// `USER_WORKING_DIR` special-var override; defaults to the process cwd.
	pub user_working_dir: PathBuf,
	/// Arguments following `--`, exposed as `CLI_ARGS`.
	pub cli_args: Vec<String>,
}

impl ExecutorOptions {
	/// Build options with every flag at its spec.md-documented default,
	/// rooted at `dir`.
	#[must_use]
	pub fn new(dir: PathBuf) -> Self {
		let cache_root = dir.join(".task-loop");
		Self {
			user_working_dir: dir.clone(),
			dir,
			entrypoint: None,
			temp_dir_remote: cache_root.join("remote"),
			temp_dir_fingerprint: cache_root.join("checksum"),
			cache_root,
			silent: false,
			verbose: false,
			dry: false,
			force: false,
			force_all: false,
			concurrency: 0,
			insecure: false,
			download: false,
			offline: false,
			assume_yes: false,
			summary: false,
			output: OutputStyle::default(),
			timeout: None,
			version_check: true,
			cli_args: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn discovers_nested_taskfile_by_walking_up() {
		let dir = tempfile::tempdir().expect("tempdir");
		let nested = dir.path().join("a/b/c");
		std::fs::create_dir_all(&nested).unwrap();
		std::fs::write(dir.path().join("Taskfile.yml"), "version: '3'\n").unwrap();

		let found = discover_entrypoint(&nested).expect("should find taskfile");
		assert_eq!(found, dir.path().join("Taskfile.yml"));
	}

	#[test]
	fn returns_none_when_nothing_found() {
		let dir = tempfile::tempdir().expect("tempdir");
		assert!(discover_entrypoint(dir.path()).is_none());
	}
}
