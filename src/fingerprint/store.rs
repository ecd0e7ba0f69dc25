//! Persistent storage for fingerprint digests, one small file per
//! fingerprint key directly under `cache_root` (the caller, typically
//! `ExecutorOptions::temp_dir_fingerprint`, already picks a dedicated
//! directory for this).
//!
//! Grounded on `fetch/remote.rs`'s cache writer: write to a temp file next
//! to the target, then rename, so a crash mid-write never leaves a
//! half-written fingerprint behind.

use color_eyre::{eyre::WrapErr, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FingerprintStore {
	cache_root: PathBuf,
}

impl FingerprintStore {
	#[must_use]
	pub fn new(cache_root: PathBuf) -> Self {
		Self { cache_root }
	}

	fn path_for(&self, key: &str) -> PathBuf {
		let safe_key = key.replace('/', "_");
		self.cache_root.join(safe_key)
	}

	/// Read the previously stored digest for `key`, if any.
	///
	/// # Errors
	///
	/// I/O failures other than the file not existing.
	pub async fn read(&self, key: &str) -> Result<Option<String>> {
		match async_std::fs::read_to_string(self.path_for(key)).await {
			Ok(contents) => Ok(Some(contents)),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(err) => Err(err).wrap_err_with(|| format!("failed to read fingerprint for {}", key)),
		}
	}

	/// Write `digest` for `key`, unless it is already what is stored (which
	/// preserves the existing file's mtime for downstream tooling).
	///
	/// # Errors
	///
	/// I/O failures creating the cache directory or writing the file.
	pub async fn write_if_changed(&self, key: &str, digest: &str) -> Result<()> {
		if self.read(key).await?.as_deref() == Some(digest) {
			return Ok(());
		}

		let path = self.path_for(key);
		if let Some(parent) = path.parent() {
			async_std::fs::create_dir_all(parent)
				.await
				.wrap_err_with(|| format!("failed to create fingerprint cache dir {:?}", parent))?;
		}

		let tmp = path.with_extension("tmp");
		async_std::fs::write(&tmp, digest)
			.await
			.wrap_err_with(|| format!("failed to write fingerprint for {}", key))?;
		async_std::fs::rename(&tmp, &path)
			.await
			.wrap_err_with(|| format!("failed to commit fingerprint for {}", key))?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[async_std::test]
	async fn write_then_read_roundtrips() {
		let dir = tempfile::tempdir().expect("tempdir");
		let store = FingerprintStore::new(dir.path().to_path_buf());

		assert_eq!(store.read("task-a").await.unwrap(), None);

		store.write_if_changed("task-a", "abc123").await.unwrap();
		assert_eq!(store.read("task-a").await.unwrap(), Some("abc123".to_owned()));

		store.write_if_changed("task-a", "abc123").await.unwrap();
		assert_eq!(store.read("task-a").await.unwrap(), Some("abc123".to_owned()));

		store.write_if_changed("task-a", "def456").await.unwrap();
		assert_eq!(store.read("task-a").await.unwrap(), Some("def456".to_owned()));
	}
}
