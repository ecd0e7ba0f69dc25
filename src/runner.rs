//! The Scheduler / Runner: executes a single `Call` end to end, per
//! spec.md §4.4 — compile, preconditions, dedup, required-variable check,
//! up-to-date check, concurrent deps, a concurrency-limited cmds phase,
//! and a guaranteed LIFO defer drain.
//!
//! Grounded on the teacher's `execute_tasks_in_parallel` (atomic-counter
//! polling barrier instead of a condvar/`Notify`, `has_ctrlc_been_hit()`
//! cancellation check woven through the poll loop) and
//! `tasks/execution/preparation.rs`'s recursive `build_ordered_execution_list`,
//! generalized from the teacher's fixed `oneof`/`pipeline` task *types* to a
//! single task shape whose `deps`/`cmds` carry the same nesting.

use crate::compiler::compile;
use crate::config::types::{CompiledCmd, CompiledTask, FingerprintMethod, RunPolicy, TaskCall};
use crate::config::ExecutorOptions;
use crate::error::RunnerError;
use crate::executors::ShellExecutor;
use crate::fingerprint::{self, FingerprintStore};
use crate::sigint::CancellationToken;
use crate::tasks::LoadedTaskfile;
use crate::terminal::renderer::RenderSink;
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result, Section,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A per-call counter cap above which a chain of task calls is treated as a
/// runtime cycle (deps/cmds calling each other without terminating), per
/// spec.md §9.
const MAX_CALLS_PER_TASK: u32 = 100;

/// How long a task blocked on another's `run: once`/`when_changed`
/// completion polls before checking again.
const DEDUP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How often the concurrency-limit semaphore is polled for a free slot.
const SEMAPHORE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A single fingerprint key's completion state, shared by every caller that
/// dedups onto it. Polled rather than notified, matching the teacher's own
/// preference for atomic-counter + sleep barriers over condvars.
struct DedupEntry {
	done: std::sync::atomic::AtomicBool,
	result: StdMutex<Option<Result<(), String>>>,
}

impl DedupEntry {
	fn new() -> Self {
		Self {
			done: std::sync::atomic::AtomicBool::new(false),
			result: StdMutex::new(None),
		}
	}

	fn complete(&self, result: &Result<()>) {
		let stored = match result {
			Ok(()) => Ok(()),
			Err(err) => Err(format!("{:?}", err)),
		};
		*self.result.lock().expect("dedup mutex poisoned") = Some(stored);
		self.done.store(true, Ordering::SeqCst);
	}

	async fn wait(&self) -> Result<()> {
		loop {
			if self.done.load(Ordering::SeqCst) {
				let guard = self.result.lock().expect("dedup mutex poisoned");
				return match guard.as_ref().expect("dedup entry marked done with no result") {
					Ok(()) => Ok(()),
					Err(msg) => Err(eyre!("{}", msg)),
				};
			}
			async_std::task::sleep(DEDUP_POLL_INTERVAL).await;
		}
	}
}

/// A simple counting semaphore limiting the number of tasks in their "cmds"
/// phase concurrently; `limit == 0` means unlimited. Implemented as an
/// atomic counter polled on a short sleep, matching the teacher's
/// `execute_tasks_in_parallel` barrier idiom rather than reaching for an
/// external semaphore crate.
struct Semaphore {
	limit: usize,
	in_use: AtomicUsize,
}

impl Semaphore {
	fn new(limit: usize) -> Self {
		Self {
			limit,
			in_use: AtomicUsize::new(0),
		}
	}

	async fn acquire(&self) -> SemaphoreGuard<'_> {
		if self.limit == 0 {
			return SemaphoreGuard { sem: self, held: false };
		}
		loop {
			let current = self.in_use.load(Ordering::SeqCst);
			if current < self.limit
				&& self
					.in_use
					.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
					.is_ok()
			{
				return SemaphoreGuard { sem: self, held: true };
			}
			async_std::task::sleep(SEMAPHORE_POLL_INTERVAL).await;
		}
	}
}

struct SemaphoreGuard<'a> {
	sem: &'a Semaphore,
	held: bool,
}

impl Drop for SemaphoreGuard<'_> {
	fn drop(&mut self) {
		if self.held {
			self.sem.in_use.fetch_sub(1, Ordering::SeqCst);
		}
	}
}

/// Shared state for one Executor run (spec.md §3's "dedup state exists for
/// the Executor lifetime").
pub struct Runner {
	loaded: LoadedTaskfile,
	options: ExecutorOptions,
	fingerprints: FingerprintStore,
	semaphore: Semaphore,
	dedup: StdMutex<HashMap<String, Arc<DedupEntry>>>,
	call_counts: StdMutex<HashMap<String, u32>>,
	sink: RenderSink,
}

impl Runner {
	#[must_use]
	pub fn new(loaded: LoadedTaskfile, options: ExecutorOptions, sink: RenderSink) -> Self {
		let fingerprints = FingerprintStore::new(options.temp_dir_fingerprint.clone());
		let concurrency = options.concurrency;
		Self {
			loaded,
			options,
			fingerprints,
			semaphore: Semaphore::new(concurrency),
			dedup: StdMutex::new(HashMap::new()),
			call_counts: StdMutex::new(HashMap::new()),
			sink,
		}
	}

	/// Run `call` as the top-level requested target. Returns the process
	/// exit code spec.md §6 documents: `0` on success, the root shell cmd's
	/// own exit status if it fails directly, `1` for any other failure.
	pub async fn run_root(self: &Arc<Self>, call: TaskCall) -> i32 {
		let cancel = CancellationToken::root();

		// A global deadline is just the root token firing on its own, per
		// spec.md §5 ("timeouts are implemented by cancelling the root
		// token"); deferred cmds still run under their own detached token.
		if let Some(timeout) = self.options.timeout {
			let timeout_cancel = cancel.clone();
			async_std::task::spawn(async move {
				async_std::task::sleep(timeout).await;
				timeout_cancel.cancel();
			});
		}

		match self.run_call(call, &cancel, true).await {
			Ok(()) => 0,
			Err(err) => {
				if let Some(RunnerError::CommandFailed { code, .. }) = err.downcast_ref::<RunnerError>() {
					self.sink.message(format!("task-loop: {:?}", err));
					return (*code).clamp(1, 255);
				}
				self.sink.message(format!("task-loop: {:?}", err));
				1
			}
		}
	}

	/// Execute one Call through the full state machine described in
	/// spec.md §4.4. Boxed because the cmds phase recurses into nested
	/// `Call` cmds/deps.
	fn run_call<'a>(
		self: &'a Arc<Self>,
		call: TaskCall,
		cancel: &'a CancellationToken,
		is_root: bool,
	) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
		Box::pin(async move {
			if cancel.is_cancelled() {
				return Err(eyre!(RunnerError::Cancelled));
			}

			// 1. Compile.
			let compiled = compile(&self.loaded, &self.options, &call)
				.await
				.wrap_err_with(|| format!("failed to compile task \"{}\"", call.target))?;

			self.bump_call_count(&compiled.name)?;

			// 2. Preconditions.
			check_preconditions(&compiled)?;

			// `force` only bypasses the up-to-date check for the root target
			// itself; `force_all` bypasses it everywhere.
			let skip_up_to_date = self.options.force_all || (is_root && self.options.force);

			// 3 + 4 + rest happen inside `run_compiled`, behind the dedup
			// table when the policy calls for it.
			match compiled.run {
				RunPolicy::Always => self.run_compiled(compiled, cancel, skip_up_to_date).await,
				RunPolicy::Once | RunPolicy::WhenChanged => {
					self.run_with_dedup(compiled, cancel, is_root, skip_up_to_date).await
				}
			}
		})
	}

	fn bump_call_count(&self, name: &str) -> Result<()> {
		let mut counts = self.call_counts.lock().expect("call count mutex poisoned");
		let count = counts.entry(name.to_owned()).or_insert(0);
		*count += 1;
		if *count > MAX_CALLS_PER_TASK {
			return Err(eyre!(RunnerError::CalledTooManyTimes {
				name: name.to_owned(),
				count: *count,
			}));
		}
		Ok(())
	}

	async fn run_with_dedup(
		self: &Arc<Self>,
		compiled: CompiledTask,
		cancel: &CancellationToken,
		is_root: bool,
		skip_up_to_date: bool,
	) -> Result<()> {
		let key = compiled.fingerprint_key.clone();

		let (entry, is_owner) = {
			let mut table = self.dedup.lock().expect("dedup mutex poisoned");
			if let Some(existing) = table.get(&key) {
				(existing.clone(), false)
			} else {
				let entry = Arc::new(DedupEntry::new());
				table.insert(key.clone(), entry.clone());
				(entry, true)
			}
		};

		if !is_owner {
			info!("task \"{}\" already in flight elsewhere; awaiting its result", compiled.name);
			return entry.wait().await;
		}

		let result = self.run_compiled(compiled, cancel, skip_up_to_date).await;
		entry.complete(&result);
		let _ = is_root;
		result
	}

	async fn run_compiled(
		self: &Arc<Self>,
		compiled: CompiledTask,
		cancel: &CancellationToken,
		skip_up_to_date: bool,
	) -> Result<()> {
		// 4. Required variables.
		check_requirements(&compiled)?;

		// 5. Up-to-date check. Only applies when `run != always` or the task
		// declares sources/status/generates (spec.md §4.3); a plain
		// `run: always` task with none of those never consults the
		// fingerprint store at all.
		let needs_up_to_date_check = compiled.run != RunPolicy::Always
			|| !compiled.sources.is_empty()
			|| !compiled.status.is_empty()
			|| !compiled.generates.is_empty();

		if !skip_up_to_date && needs_up_to_date_check {
			let up_to_date = if compiled.method == FingerprintMethod::None {
				false
			} else {
				fingerprint::is_up_to_date(&self.fingerprints, &compiled)
					.await
					.wrap_err_with(|| format!("failed to check up-to-date status for \"{}\"", compiled.name))?
			};

			if up_to_date {
				if self.options.verbose && !compiled.silent {
					self.sink.message(format!("task \"{}\" is up to date", compiled.name));
				}
				return Ok(());
			}
		}

		// 6. Deps run concurrently.
		self.run_deps(&compiled, cancel).await?;

		// 7. Acquire concurrency slot for the cmds phase only.
		let _permit = self.semaphore.acquire().await;

		if cancel.is_cancelled() {
			return Err(eyre!(RunnerError::Cancelled));
		}

		// 8 + 9. cmds, then the defer stack, always.
		let outcome = self.run_cmds(&compiled, cancel).await;

		// 10. Persist fingerprint on success only, never in dry mode.
		if outcome.is_ok() && !self.options.dry {
			fingerprint::persist(&self.fingerprints, &compiled)
				.await
				.wrap_err_with(|| format!("failed to persist fingerprint for \"{}\"", compiled.name))?;
		}

		outcome
	}

	async fn run_deps(self: &Arc<Self>, compiled: &CompiledTask, cancel: &CancellationToken) -> Result<()> {
		if compiled.deps.is_empty() {
			return Ok(());
		}

		let dep_cancel = cancel.child();
		let mut handles = Vec::with_capacity(compiled.deps.len());
		for dep in &compiled.deps {
			let runner = self.clone();
			let dep_call = dep.clone();
			let token = dep_cancel.clone();
			handles.push(async_std::task::spawn(async move {
				runner.run_call(dep_call, &token, false).await
			}));
		}

		let mut errors = Vec::new();
		for handle in handles {
			if let Err(err) = handle.await {
				dep_cancel.cancel();
				errors.push(err);
			}
		}

		if errors.is_empty() {
			return Ok(());
		}

		let mut primary = errors.remove(0);
		for secondary in errors {
			primary = primary.note(format!("additional dep failure: {:?}", secondary));
		}
		Err(primary)
	}

	async fn run_cmds(self: &Arc<Self>, compiled: &CompiledTask, cancel: &CancellationToken) -> Result<()> {
		let mut deferred: Vec<&CompiledCmd> = Vec::new();
		let mut failure: Option<color_eyre::Report> = None;

		for cmd in &compiled.cmds {
			if let CompiledCmd::Defer(inner) = cmd {
				deferred.push(inner);
				continue;
			}

			if failure.is_some() || cancel.is_cancelled() {
				break;
			}

			if let Err(err) = self.run_one_cmd(compiled, cmd, cancel).await {
				failure = Some(err);
				break;
			}
		}

		// Deferred cmds always run, LIFO, under a detached token, regardless
		// of the outcome above (spec.md §3, §5, §9).
		let detached = CancellationToken::detached();
		for cmd in deferred.into_iter().rev() {
			if let Err(defer_err) = self.run_one_cmd(compiled, cmd, &detached).await {
				warn!(
					"deferred cmd in task \"{}\" failed: {:?} (does not override the primary result)",
					compiled.name, defer_err
				);
			}
		}

		match failure {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	async fn run_one_cmd(
		self: &Arc<Self>,
		compiled: &CompiledTask,
		cmd: &CompiledCmd,
		cancel: &CancellationToken,
	) -> Result<()> {
		match cmd {
			CompiledCmd::Shell { cmd, silent, ignore_error } => {
				self.run_shell_cmd(compiled, cmd, *silent, *ignore_error, cancel).await
			}
			CompiledCmd::Call { call, silent, ignore_error } => {
				let mut call = call.clone();
				call.silent = call.silent || *silent;
				let outcome = self.run_call(call.clone(), cancel, false).await;
				match outcome {
					Ok(()) => Ok(()),
					Err(err) if *ignore_error => {
						warn!("ignoring failure from nested call to \"{}\": {:?}", call.target, err);
						Ok(())
					}
					Err(err) => Err(err),
				}
			}
			CompiledCmd::Defer(inner) => self.run_one_cmd(compiled, inner, cancel).await,
		}
	}

	async fn run_shell_cmd(
		self: &Arc<Self>,
		compiled: &CompiledTask,
		cmd: &str,
		silent: bool,
		ignore_error: bool,
		cancel: &CancellationToken,
	) -> Result<()> {
		let announce = !(silent || compiled.silent);
		if announce {
			self.sink.banner(&compiled.name, cmd, self.options.dry);
		}

		if self.options.dry {
			return Ok(());
		}

		let code = ShellExecutor::execute(&compiled.name, cmd, &compiled.shell, &compiled.dir, &compiled.env, &self.sink, cancel)
			.await
			.wrap_err_with(|| format!("failed to run cmd in task \"{}\"", compiled.name))?;

		if code == 0 {
			return Ok(());
		}

		let err = RunnerError::CommandFailed {
			task: compiled.name.clone(),
			code,
		};

		if ignore_error || compiled.ignore_error {
			warn!("task \"{}\" cmd exited {} but ignore_error is set", compiled.name, code);
			return Ok(());
		}

		Err(eyre!(err))
	}
}

fn check_preconditions(compiled: &CompiledTask) -> Result<()> {
	for (script, message) in &compiled.preconditions {
		let status = std::process::Command::new("sh")
			.arg("-c")
			.arg(script)
			.current_dir(&compiled.dir)
			.status()
			.wrap_err_with(|| format!("failed to run precondition for task \"{}\"", compiled.name))?;

		if !status.success() {
			return Err(eyre!(RunnerError::PreconditionFailed {
				task: compiled.name.clone(),
				message: message.clone().unwrap_or_else(|| "precondition failed".to_owned()),
			}));
		}
	}
	Ok(())
}

fn check_requirements(compiled: &CompiledTask) -> Result<()> {
	let mut missing = Vec::new();
	for req in &compiled.requires {
		match &req.value {
			None => missing.push(req.name.clone()),
			Some(value) if value.is_empty() => missing.push(req.name.clone()),
			Some(value) => {
				if let Some(allowed) = &req.allowed {
					if !allowed.iter().any(|a| a == value) {
						return Err(eyre!(RunnerError::InvalidEnumValue {
							name: req.name.clone(),
							value: value.clone(),
							allowed: allowed.clone(),
						}));
					}
				}
			}
		}
	}

	if missing.is_empty() {
		Ok(())
	} else {
		Err(eyre!(RunnerError::MissingRequiredVars { names: missing }))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::{OutputStyle, VarValue};
	use crate::fetch::{FetcherRepository, Location, RemotePolicy};
	use crate::tasks::load;
	use crate::terminal::renderer::OutputRenderer;
	use indexmap::IndexMap;

	async fn build_runner(dir: &std::path::Path, yaml: &str) -> (Arc<Runner>, OutputRenderer) {
		std::fs::write(dir.join("Taskfile.yml"), yaml).unwrap();
		let fetcher = FetcherRepository::new(dir.to_path_buf(), dir.join("cache"), RemotePolicy::default());
		let loaded = load(&fetcher, Location::Path("Taskfile.yml".to_owned()), dir.to_path_buf())
			.await
			.expect("should load");
		let options = ExecutorOptions::new(dir.to_path_buf());
		let (renderer, sink) = OutputRenderer::new(OutputStyle::None, false);
		(Arc::new(Runner::new(loaded, options, sink)), renderer)
	}

	fn call(target: &str) -> TaskCall {
		TaskCall {
			target: target.to_owned(),
			vars: IndexMap::new(),
			indirect: false,
			silent: false,
		}
	}

	#[async_std::test]
	async fn simple_shell_cmd_succeeds() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (runner, renderer) = build_runner(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    cmds:\n      - echo hi\n",
		)
		.await;

		let code = runner.run_root(call("default")).await;
		drop(runner);
		renderer.drain();
		assert_eq!(code, 0);
	}

	#[async_std::test]
	async fn failing_cmd_surfaces_nonzero_exit() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (runner, renderer) = build_runner(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    cmds:\n      - exit 3\n",
		)
		.await;

		let code = runner.run_root(call("default")).await;
		drop(runner);
		renderer.drain();
		assert_eq!(code, 3);
	}

	#[async_std::test]
	async fn deferred_cmd_runs_after_failure() {
		let dir = tempfile::tempdir().expect("tempdir");
		let marker = dir.path().join("ran-defer");
		let yaml = format!(
			"version: '3'\ntasks:\n  default:\n    cmds:\n      - echo A\n      - exit 1\n      - echo B\n      - defer: touch {}\n",
			marker.display()
		);
		let (runner, renderer) = build_runner(dir.path(), &yaml).await;

		let code = runner.run_root(call("default")).await;
		drop(runner);
		renderer.drain();

		assert_ne!(code, 0);
		assert!(marker.exists(), "deferred cmd should still have run");
	}

	#[async_std::test]
	async fn missing_required_var_fails() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (runner, renderer) = build_runner(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    requires:\n      vars: [FOO]\n    cmds:\n      - echo hi\n",
		)
		.await;

		let code = runner.run_root(call("default")).await;
		drop(runner);
		renderer.drain();
		assert_ne!(code, 0);
	}

	#[async_std::test]
	async fn required_var_with_value_succeeds() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (runner, renderer) = build_runner(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    requires:\n      vars: [FOO]\n    cmds:\n      - echo {{ .FOO }}\n",
		)
		.await;

		let mut vars = IndexMap::new();
		vars.insert("FOO".to_owned(), VarValue::String("bar".to_owned()));
		let mut c = call("default");
		c.vars = vars;

		let code = runner.run_root(c).await;
		drop(runner);
		renderer.drain();
		assert_eq!(code, 0);
	}

	#[async_std::test]
	async fn precondition_failure_aborts() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (runner, renderer) = build_runner(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    preconditions:\n      - sh: \"[ 1 = 0 ]\"\n        msg: \"nope\"\n    cmds:\n      - echo hi\n",
		)
		.await;

		let code = runner.run_root(call("default")).await;
		drop(runner);
		renderer.drain();
		assert_ne!(code, 0);
	}

	#[async_std::test]
	async fn run_once_executes_body_a_single_time() {
		let dir = tempfile::tempdir().expect("tempdir");
		let counter = dir.path().join("count");
		let yaml = format!(
			"version: '3'\ntasks:\n  shared:\n    run: once\n    method: none\n    cmds:\n      - sh -c \"echo x >> {}\"\n  default:\n    deps:\n      - task: shared\n      - task: shared\n",
			counter.display()
		);
		let (runner, renderer) = build_runner(dir.path(), &yaml).await;

		let code = runner.run_root(call("default")).await;
		drop(runner);
		renderer.drain();

		assert_eq!(code, 0);
		let contents = std::fs::read_to_string(&counter).unwrap_or_default();
		assert_eq!(contents.lines().count(), 1, "shared dep should only have run once");
	}

	#[async_std::test]
	async fn cancelled_root_token_skips_execution() {
		let dir = tempfile::tempdir().expect("tempdir");
		let (runner, renderer) = build_runner(
			dir.path(),
			"version: '3'\ntasks:\n  default:\n    cmds:\n      - echo hi\n",
		)
		.await;

		let cancel = CancellationToken::root();
		cancel.cancel();
		let result = runner.run_call(call("default"), &cancel, true).await;
		drop(runner);
		renderer.drain();
		assert!(result.is_err());
	}
}
