//! The Command Executor: invokes an external POSIX-compatible shell
//! interpreter with a cmd's resolved env/cwd/stdio, per spec.md §4.5.
//!
//! Grounded on the teacher's (now-removed) `executors/host.rs` `execute()`:
//! spawn the child, stream stdout/stderr line-by-line over a channel, poll
//! `try_wait()` against a cancellation flag rather than blocking forever on
//! `wait()`. The teacher's `ExecutorRepository`/`Executor` trait multi-backend
//! selection (`docker` vs `host`, `needs`/`custom_executor` matching) is
//! dropped in full, per spec.md's Non-goal of "no sandboxing of executed
//! commands" — there is exactly one executor, a plain shell.

use crate::config::types::ShellOptions;
use crate::sigint::CancellationToken;
use crate::terminal::renderer::RenderSink;
use color_eyre::{eyre::WrapErr, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

/// Grace period between sending `SIGINT` and escalating to `SIGKILL` once a
/// task's cancellation token fires mid-command, per spec.md §5.
const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// How often the execution loop polls `try_wait()`/cancellation while a
/// child is running.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs a single shell cmd to completion (or until cancelled), streaming its
/// output line-by-line through `sink`.
pub struct ShellExecutor;

impl ShellExecutor {
	/// Execute `cmd` under `shell` in `dir` with `env`, reporting output
	/// lines for `task_name` through `sink`.
	///
	/// Returns the process's exit code (or a synthetic `130`/`137` if it was
	/// cancelled via SIGINT/SIGKILL and produced no exit status).
	///
	/// # Errors
	///
	/// The shell interpreter fails to spawn.
	pub async fn execute(
		task_name: &str,
		cmd: &str,
		shell: &ShellOptions,
		dir: &Path,
		env: &HashMap<String, String>,
		sink: &RenderSink,
		cancel: &CancellationToken,
	) -> Result<i32> {
		let full_cmd = if shell.pipefail() {
			format!("set -o pipefail; {}", cmd)
		} else {
			cmd.to_owned()
		};

		let mut child = Command::new(shell.executable())
			.arg("-c")
			.arg(&full_cmd)
			.current_dir(dir)
			.envs(env)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.spawn()
			.wrap_err_with(|| format!("failed to spawn shell for task \"{}\"", task_name))?;

		let (line_tx, line_rx) = mpsc::channel::<(String, bool)>();
		spawn_line_reader(child.stdout.take(), line_tx.clone(), false);
		spawn_line_reader(child.stderr.take(), line_tx, true);

		let mut cancel_state = CancelState::None;
		let code = loop {
			// Drain whatever lines have arrived so output stays interleaved
			// with the poll loop instead of bursting out at the end.
			while let Ok((text, is_stderr)) = line_rx.try_recv() {
				sink.output(task_name, &text, is_stderr);
			}

			if let Some(status) = child.try_wait().wrap_err("failed to poll child process")? {
				break status.code().unwrap_or(-1);
			}

			if cancel.is_cancelled() {
				cancel_state = advance_cancellation(&mut child, cancel_state);
			}

			async_std::task::sleep(POLL_INTERVAL).await;
		};

		// Final drain: a child can exit with buffered output still in flight.
		while let Ok((text, is_stderr)) = line_rx.try_recv() {
			sink.output(task_name, &text, is_stderr);
		}

		Ok(code)
	}
}

/// Tracks how far along the SIGINT → grace period → SIGKILL escalation a
/// cancelled child is.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CancelState {
	None,
	Signalled(std::time::Instant),
	Killed,
}

fn advance_cancellation(child: &mut Child, state: CancelState) -> CancelState {
	match state {
		CancelState::None => {
			send_signal(child.id(), libc::SIGINT);
			CancelState::Signalled(std::time::Instant::now())
		}
		CancelState::Signalled(at) if at.elapsed() >= CANCEL_GRACE_PERIOD => {
			send_signal(child.id(), libc::SIGKILL);
			CancelState::Killed
		}
		other => other,
	}
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) {
	unsafe {
		libc::kill(pid as libc::pid_t, signal);
	}
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: i32) {}

/// Spawn a reader thread over a child's stdout/stderr pipe, forwarding
/// complete lines to `tx`. Runs on a plain OS thread rather than an async
/// task since `std::process::ChildStdout`/`ChildStderr` are blocking reads.
fn spawn_line_reader(
	pipe: Option<impl std::io::Read + Send + 'static>,
	tx: mpsc::Sender<(String, bool)>,
	is_stderr: bool,
) {
	let Some(pipe) = pipe else { return };
	std::thread::spawn(move || {
		let reader = BufReader::new(pipe);
		for line in reader.lines() {
			match line {
				Ok(text) => {
					if tx.send((text, is_stderr)).is_err() {
						return;
					}
				}
				Err(_) => return,
			}
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sigint::CancellationToken;
	use crate::terminal::renderer::OutputRenderer;
	use crate::config::types::OutputStyle;

	#[async_std::test]
	async fn runs_a_simple_command_and_reports_exit_code() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (renderer, sink) = OutputRenderer::new(OutputStyle::None, false);
		let handle = std::thread::spawn(move || renderer.drain());

		let code = ShellExecutor::execute(
			"t",
			"exit 0",
			&ShellOptions::default(),
			dir.path(),
			&HashMap::new(),
			&sink,
			&CancellationToken::new(),
		)
		.await
		.expect("should run");

		assert_eq!(code, 0);
		drop(sink);
		handle.join().expect("renderer thread should exit");
	}

	#[async_std::test]
	async fn nonzero_exit_is_reported() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (renderer, sink) = OutputRenderer::new(OutputStyle::None, false);
		let handle = std::thread::spawn(move || renderer.drain());

		let code = ShellExecutor::execute(
			"t",
			"exit 7",
			&ShellOptions::default(),
			dir.path(),
			&HashMap::new(),
			&sink,
			&CancellationToken::new(),
		)
		.await
		.expect("should run");

		assert_eq!(code, 7);
		drop(sink);
		handle.join().expect("renderer thread should exit");
	}
}
