//! Root cancellation. Generalizes the teacher's `RUNNING: Arc<AtomicBool>` +
//! `ctrlc` pattern into a `CancellationToken` newtype so deferred cmds can be
//! handed a fresh, un-cancelled token while the rest of the run observes the
//! cancelled one (spec.md §9: "deferred cleanup under cancellation requires
//! a detached cancellation scope").

use color_eyre::{eyre::WrapErr, Result, Section};
use lazy_static::lazy_static;
use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

lazy_static! {
	pub static ref RUNNING: Arc<AtomicBool> = Arc::new(AtomicBool::new(true));
}

/// Determines if Ctrl-C has been hit on the process-wide flag.
#[must_use]
pub fn has_ctrlc_been_hit() -> bool {
	!RUNNING.clone().load(Ordering::Acquire)
}

/// Setup the CTRL-C Handler.
///
/// Watches for Ctrl-C, and properly handles shutdown for an application so
/// we don't leave junk everywhere.
///
/// # Errors
///
/// - Bubbled up error from `ctrlc` crate.
pub fn setup_global_ctrlc_handler() -> Result<()> {
	let r = RUNNING.clone();
	ctrlc::set_handler(move || {
		r.store(false, Ordering::Release);
	})
	.wrap_err("Failed to setup Ctrl-C handler.")
	.note("If the error isn't immediately clear, there's probably something really wrong going on, it'd be best to file an issue.")?;

	Ok(())
}

/// A cloneable cancellation flag threaded through a single Call's task tree.
///
/// Every task execution polls `is_cancelled()` at its suspension points
/// (awaiting deps, awaiting the concurrency semaphore, awaiting the shell's
/// exit). `child()` derives a token that also observes the parent (used for
/// deps/nested calls); `detached()` produces a token that ignores the parent
/// entirely so deferred cmds keep running even after the owning task's token
/// fires, per spec.md §9.
#[derive(Clone)]
pub struct CancellationToken {
	flag: Arc<AtomicBool>,
	parent: Option<Arc<CancellationToken>>,
	/// Whether this token additionally consults the process-wide Ctrl-C
	/// flag. `false` only for tokens produced by `detached()`, so deferred
	/// cmds keep running under Ctrl-C, not just under an explicit `cancel()`.
	observe_global: bool,
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

impl CancellationToken {
	/// Create a new, unlinked root token that also observes the global
	/// Ctrl-C flag.
	#[must_use]
	pub fn new() -> Self {
		Self {
			flag: Arc::new(AtomicBool::new(false)),
			parent: None,
			observe_global: true,
		}
	}

	/// Create a root token that also observes the global Ctrl-C flag.
	#[must_use]
	pub fn root() -> Self {
		Self::new()
	}

	/// True if this token (or any ancestor) has been cancelled, or — unless
	/// this is a `detached()` token — if the process-wide Ctrl-C flag has
	/// been hit.
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		if self.observe_global && has_ctrlc_been_hit() {
			return true;
		}
		if self.flag.load(Ordering::SeqCst) {
			return true;
		}
		self.parent.as_ref().is_some_and(|p| p.is_cancelled())
	}

	/// Cancel this token and every descendant derived from it.
	pub fn cancel(&self) {
		self.flag.store(true, Ordering::SeqCst);
	}

	/// Derive a child token: cancelling the parent cancels the child, but not
	/// vice versa. Inherits the parent's `observe_global` setting.
	#[must_use]
	pub fn child(&self) -> Self {
		Self {
			flag: Arc::new(AtomicBool::new(false)),
			parent: Some(Arc::new(self.clone())),
			observe_global: self.observe_global,
		}
	}

	/// Produce a fresh token with no link to this one at all and that
	/// ignores the global Ctrl-C flag, for deferred cmds that must run
	/// regardless of the owning task's cancellation (spec.md §9: "deferred
	/// cleanup under cancellation requires a detached cancellation scope").
	#[must_use]
	pub fn detached() -> Self {
		Self {
			flag: Arc::new(AtomicBool::new(false)),
			parent: None,
			observe_global: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn child_observes_parent_cancellation() {
		let parent = CancellationToken::new();
		let child = parent.child();
		assert!(!child.is_cancelled());
		parent.cancel();
		assert!(child.is_cancelled());
	}

	#[test]
	fn detached_token_ignores_parent() {
		let parent = CancellationToken::new();
		parent.cancel();
		let detached = CancellationToken::detached();
		assert!(!detached.is_cancelled());
	}
}
