#![allow(
	clippy::module_name_repetitions,
	clippy::result_map_unwrap_or_else,
	clippy::wildcard_imports
)]

//! `task_loop` is a declarative, YAML driven task runner and execution
//! engine. A taskfile describes a graph of named tasks; the crate compiles a
//! requested invocation into a concrete execution plan and runs it honoring
//! dependency ordering, concurrency limits, up-to-date checks, and
//! cancellation.

pub mod commands;
pub mod compiler;
pub mod config;
pub mod dirs;
pub mod error;
pub mod executors;
pub mod fetch;
pub mod fingerprint;
pub mod future_helper;
pub mod log;
pub mod runner;
pub mod scope;
pub mod sigint;
pub mod strsim;
pub mod tasks;
pub mod template;
pub mod terminal;
pub mod yaml_err;

pub use sigint::has_ctrlc_been_hit;

use std::path::PathBuf;

/// Get the temporary directory for this host.
#[must_use]
pub fn get_tmp_dir() -> PathBuf {
	dirs::get_tmp_dir()
}
