//! Implements the `clean` command: clears the remote-include and fingerprint
//! caches under an Executor's `cache_root`. Always safe to run; the next
//! `run` simply refetches/recomputes everything.

use crate::config::ExecutorOptions;
use color_eyre::{eyre::WrapErr, Result};

/// Remove the on-disk remote and fingerprint caches.
///
/// # Errors
///
/// An I/O failure removing either cache directory (not existing is not an
/// error).
pub async fn handle_clean_command(options: &ExecutorOptions) -> Result<i32> {
	print!("Cleaning cache at {:?} ...", options.cache_root);

	remove_dir_if_present(&options.temp_dir_remote)
		.await
		.wrap_err("failed to clean the remote include cache")?;
	remove_dir_if_present(&options.temp_dir_fingerprint)
		.await
		.wrap_err("failed to clean the fingerprint cache")?;

	println!(" done.");
	Ok(0)
}

async fn remove_dir_if_present(path: &std::path::Path) -> Result<()> {
	match async_std::fs::remove_dir_all(path).await {
		Ok(()) => Ok(()),
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(err) => Err(err.into()),
	}
}
