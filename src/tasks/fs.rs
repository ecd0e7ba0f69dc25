//! Filesystem setup needed before a run starts: making sure the remote and
//! fingerprint cache roots exist.

use crate::config::ExecutorOptions;
use color_eyre::{eyre::WrapErr, Result};

/// Create the remote and fingerprint cache directories if they don't
/// already exist.
///
/// # Errors
///
/// I/O failures creating either directory.
pub async fn ensure_dirs(options: &ExecutorOptions) -> Result<()> {
	async_std::fs::create_dir_all(&options.temp_dir_remote)
		.await
		.wrap_err_with(|| format!("failed to create remote cache dir {:?}", options.temp_dir_remote))?;
	async_std::fs::create_dir_all(&options.temp_dir_fingerprint)
		.await
		.wrap_err_with(|| {
			format!(
				"failed to create fingerprint cache dir {:?}",
				options.temp_dir_fingerprint
			)
		})?;
	Ok(())
}
