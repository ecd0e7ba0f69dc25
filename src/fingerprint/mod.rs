//! The Fingerprinter: decides whether a compiled task's work is already
//! done, via a status script, a content checksum, or source/generated
//! mtimes, per spec.md §4.3.
//!
//! No direct teacher analog exists (the teacher has no caching concept at
//! all); the checksum method's digest algorithm (`sha2::Sha256`) matches
//! its use for cache keys in `fetch/remote.rs`, and the on-disk cache file
//! convention is grounded on the same module's atomic writer.

use crate::config::types::{CompiledTask, FingerprintMethod};
use color_eyre::{eyre::WrapErr, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

pub mod store;

pub use store::FingerprintStore;

/// Decide whether `task`'s declared work is already done.
///
/// A non-empty `status:` list always takes precedence over the task's
/// `method`, matching spec.md §4.3's ordering.
///
/// # Errors
///
/// I/O failures reading sources/generates, or a status script failing to
/// spawn (a non-zero *exit*, by contrast, is just a "not up to date"
/// result, not an error).
pub async fn is_up_to_date(store: &FingerprintStore, task: &CompiledTask) -> Result<bool> {
	if !task.status.is_empty() {
		return run_status_scripts(task);
	}

	match task.method {
		FingerprintMethod::None => Ok(false),
		FingerprintMethod::Timestamp => timestamp_up_to_date(task),
		FingerprintMethod::Checksum => checksum_up_to_date(store, task).await,
	}
}

/// Persist the fingerprint for a task that just completed successfully.
/// A no-op for the `timestamp`/`none` methods, and for `checksum` when the
/// freshly computed digest matches what's already stored.
///
/// # Errors
///
/// I/O failures computing or writing the digest.
pub async fn persist(store: &FingerprintStore, task: &CompiledTask) -> Result<()> {
	if !matches!(task.method, FingerprintMethod::Checksum) {
		return Ok(());
	}

	let digest = compute_checksum(task)?;
	store.write_if_changed(&task.fingerprint_key, &digest).await
}

fn run_status_scripts(task: &CompiledTask) -> Result<bool> {
	for script in &task.status {
		let status = Command::new("sh")
			.arg("-c")
			.arg(script)
			.current_dir(&task.dir)
			.status()
			.wrap_err_with(|| format!("failed to run status script \"{}\"", script))?;

		if !status.success() {
			return Ok(false);
		}
	}
	Ok(true)
}

fn timestamp_up_to_date(task: &CompiledTask) -> Result<bool> {
	if task.generates.is_empty() {
		return Ok(false);
	}

	let newest_source = newest_mtime(&task.sources)?;
	let newest_generated = newest_mtime(&task.generates)?;

	Ok(match (newest_source, newest_generated) {
		(_, None) => false,
		(None, Some(_)) => true,
		(Some(src), Some(gen)) => gen >= src,
	})
}

fn newest_mtime(paths: &[PathBuf]) -> Result<Option<SystemTime>> {
	let mut newest: Option<SystemTime> = None;
	for path in paths {
		let meta = match std::fs::metadata(path) {
			Ok(meta) => meta,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(err).wrap_err_with(|| format!("failed to stat {:?}", path)),
		};
		let mtime = meta
			.modified()
			.wrap_err_with(|| format!("no mtime available for {:?}", path))?;
		newest = Some(match newest {
			Some(existing) if existing > mtime => existing,
			_ => mtime,
		});
	}
	Ok(newest)
}

async fn checksum_up_to_date(store: &FingerprintStore, task: &CompiledTask) -> Result<bool> {
	if task.generates.iter().any(|p: &PathBuf| !p.exists()) {
		return Ok(false);
	}

	let digest = compute_checksum(task)?;
	let stored = store.read(&task.fingerprint_key).await?;
	Ok(stored.as_deref() == Some(digest.as_str()))
}

/// Order-independent hash of every resolved source file's contents, plus
/// the task's sorted resolved env/vars.
fn compute_checksum(task: &CompiledTask) -> Result<String> {
	let mut per_source_hashes = Vec::new();
	for path in &task.sources {
		per_source_hashes.push(hash_file(path)?);
	}
	per_source_hashes.sort();

	let mut vars: Vec<_> = task.env.iter().collect();
	vars.sort_by(|a, b| a.0.cmp(b.0));

	let mut hasher = Sha256::new();
	for hash in &per_source_hashes {
		hasher.update(hash.as_bytes());
	}
	for (k, v) in &vars {
		hasher.update(k.as_bytes());
		hasher.update(b"=");
		hasher.update(v.as_bytes());
		hasher.update(b"\n");
	}
	Ok(hex(&hasher.finalize()))
}

fn hash_file(path: &Path) -> Result<String> {
	let bytes = std::fs::read(path).wrap_err_with(|| format!("failed to read source {:?}", path))?;
	let mut hasher = Sha256::new();
	hasher.update(&bytes);
	Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
	bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::{CompiledCmd, OutputStyle, RunPolicy, ShellOptions};
	use std::collections::HashMap;
	use std::fs;

	fn blank_task(dir: &Path) -> CompiledTask {
		CompiledTask {
			name: "t".to_owned(),
			fingerprint_key: "t".to_owned(),
			dir: dir.to_path_buf(),
			cmds: Vec::<CompiledCmd>::new(),
			deps: Vec::new(),
			env: HashMap::new(),
			sources: Vec::new(),
			generates: Vec::new(),
			status: Vec::new(),
			preconditions: Vec::new(),
			requires: Vec::new(),
			run: RunPolicy::Always,
			method: FingerprintMethod::Checksum,
			ignore_error: false,
			output: OutputStyle::default(),
			silent: false,
			shell: ShellOptions::default(),
		}
	}

	#[test]
	fn timestamp_reports_stale_when_generated_is_older() {
		let dir = tempfile::tempdir().expect("tempdir");
		let source = dir.path().join("in.txt");
		let generated = dir.path().join("out.txt");
		fs::write(&source, b"source").unwrap();
		std::thread::sleep(std::time::Duration::from_millis(10));
		fs::write(&generated, b"stale").unwrap();
		// Make generated older than source by rewriting source after it.
		std::thread::sleep(std::time::Duration::from_millis(10));
		fs::write(&source, b"source2").unwrap();

		let mut task = blank_task(dir.path());
		task.method = FingerprintMethod::Timestamp;
		task.sources = vec![source];
		task.generates = vec![generated];

		assert!(!timestamp_up_to_date(&task).unwrap());
	}

	#[test]
	fn timestamp_missing_generates_is_never_up_to_date() {
		let dir = tempfile::tempdir().expect("tempdir");
		let task = blank_task(dir.path());
		assert!(!timestamp_up_to_date(&task).unwrap());
	}

	#[async_std::test]
	async fn checksum_detects_source_changes() {
		let dir = tempfile::tempdir().expect("tempdir");
		let source = dir.path().join("in.txt");
		fs::write(&source, b"v1").unwrap();

		let store = FingerprintStore::new(dir.path().join("cache"));
		let mut task = blank_task(dir.path());
		task.sources = vec![source.clone()];

		assert!(!checksum_up_to_date(&store, &task).await.unwrap());
		persist(&store, &task).await.unwrap();
		assert!(checksum_up_to_date(&store, &task).await.unwrap());

		fs::write(&source, b"v2").unwrap();
		assert!(!checksum_up_to_date(&store, &task).await.unwrap());
	}
}
