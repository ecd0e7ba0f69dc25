//! Fetches taskfile bodies over HTTP(S), backed by a persistent on-disk
//! cache so `offline` runs can still resolve previously-seen remote
//! includes.

use crate::error::RunnerError;
use crate::fetch::{Fetcher, Location, RemotePolicy};
use async_std::future;
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// A fetcher that pulls taskfile bodies from an HTTP(S) endpoint, caching
/// them under `<cache_root>/remote/<hash-of-url>.yml`.
#[derive(Debug)]
pub struct HttpFetcher {
	cache_root: PathBuf,
	pub(crate) policy: RemotePolicy,
}

impl HttpFetcher {
	#[must_use]
	pub fn new(cache_root: PathBuf, policy: RemotePolicy) -> Self {
		Self { cache_root, policy }
	}

	fn cache_path(&self, url: &str) -> PathBuf {
		let mut hasher = Sha256::new();
		hasher.update(url.as_bytes());
		let digest = hasher.finalize();
		let hex = digest.iter().map(|b| format!("{:02x}", b)).collect::<String>();
		self.cache_root.join("remote").join(format!("{}.yml", hex))
	}

	async fn read_cache(&self, url: &str) -> Option<String> {
		async_std::fs::read_to_string(self.cache_path(url)).await.ok()
	}

	async fn write_cache(&self, url: &str, body: &str) -> Result<()> {
		let path = self.cache_path(url);
		if let Some(parent) = path.parent() {
			async_std::fs::create_dir_all(parent).await?;
		}
		let tmp = path.with_extension("yml.tmp");
		async_std::fs::write(&tmp, body).await?;
		async_std::fs::rename(&tmp, &path).await?;
		Ok(())
	}

	async fn fetch_over_network(&self, url: &str) -> Result<String> {
		let dur = Duration::from_millis(30_000);
		let resp = future::timeout(dur, isahc::get_async(url))
			.await
			.map_err(|_| eyre!("timed out fetching {}", url))?
			.map_err(|err| eyre!("failed to fetch {}: {:?}", url, err))?;

		let status = resp.status().as_u16();
		if !(200..300).contains(&status) {
			return Err(eyre!("{} returned status code {}", url, status));
		}

		let mut resp = resp;
		isahc::AsyncReadResponseExt::text(&mut resp)
			.await
			.map_err(|err| eyre!("failed to read body of {}: {:?}", url, err))
	}

	/// Approve replacing the cache with a newly downloaded body that
	/// differs from what is stored. `assume_yes` auto-approves; otherwise a
	/// terminal prompt is shown.
	fn approve_replace(&self, url: &str) -> bool {
		if self.policy.assume_yes {
			return true;
		}

		eprint!(
			"remote taskfile {} has changed since it was last cached; replace cache? [y/N] ",
			url
		);
		use std::io::Write;
		let _ = std::io::stderr().flush();

		let mut answer = String::new();
		if std::io::stdin().read_line(&mut answer).is_err() {
			return false;
		}
		matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
	}
}

#[async_trait]
impl Fetcher for HttpFetcher {
	async fn fetch(&self, location: &Location, _base_dir: &Path) -> Result<String> {
		let Location::Http(url) = location else {
			return Err(eyre!("HttpFetcher given a non-http location: {:?}", location));
		};

		if self.policy.offline {
			return self.read_cache(url).await.ok_or_else(|| {
				eyre!(RunnerError::OfflineCacheMiss { path: url.clone() })
			});
		}

		if self.policy.download {
			let fresh = self.fetch_over_network(url).await?;
			if let Some(cached) = self.read_cache(url).await {
				if cached != fresh && !self.approve_replace(url) {
					info!("keeping previously cached body for {}", url);
					return Ok(cached);
				}
			}
			self.write_cache(url, &fresh).await?;
			return Ok(fresh);
		}

		if let Some(cached) = self.read_cache(url).await {
			return Ok(cached);
		}

		let fresh = self.fetch_over_network(url).await?;
		self.write_cache(url, &fresh).await?;
		Ok(fresh)
	}
}
