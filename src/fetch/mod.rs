//! The "fetcher" module is where all the implementations, and trait
//! definition live for anything that "fetches" a taskfile body.
//!
//! `PathFetcher` fetches data from the local filesystem. `HttpFetcher`
//! fetches data from a remote endpoint over HTTP(S), backed by a persistent
//! on-disk cache under `<cache_root>/remote/`.

use crate::error::RunnerError;
use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};

pub mod fs;
pub mod remote;

/// A resolved location a taskfile can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
	/// A filesystem path, relative to some base directory unless absolute.
	Path(String),
	/// An `http://` or `https://` URL.
	Http(String),
}

impl Location {
	/// Parse a raw `taskfile:` string into a `Location`.
	#[must_use]
	pub fn parse(raw: &str) -> Self {
		if raw.starts_with("http://") || raw.starts_with("https://") {
			Location::Http(raw.to_owned())
		} else {
			Location::Path(raw.to_owned())
		}
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		match self {
			Location::Path(p) | Location::Http(p) => p,
		}
	}
}

/// Policy flags controlling remote (HTTP) fetch behavior. Mirrors
/// spec.md §4.1 / §6's `download`/`offline`/`insecure`/`assume_yes` options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemotePolicy {
	/// Allow plain `http://` transports.
	pub insecure: bool,
	/// Force a refetch and rewrite the cache unconditionally.
	pub download: bool,
	/// Forbid network access entirely; fail if not already cached.
	pub offline: bool,
	/// Auto-approve replacing a cached body that changed.
	pub assume_yes: bool,
}

/// Describes a "fetcher", or something that can fetch the text contents of
/// a single taskfile location.
#[async_trait]
pub trait Fetcher {
	/// Fetch the raw text contents of `location`, resolved relative to
	/// `base_dir` for filesystem locations.
	async fn fetch(&self, location: &Location, base_dir: &Path) -> Result<String>;
}

/// Dispatches to the filesystem or HTTP fetcher based on the location kind.
pub struct FetcherRepository {
	fs: fs::PathFetcher,
	http: remote::HttpFetcher,
}

impl FetcherRepository {
	/// Construct a new repository.
	///
	/// `project_root`: local-path fetches may never escape this directory.
	/// `cache_root`: root directory for the remote taskfile cache
	/// (`<cache_root>/remote/<hash-of-url>.yml`).
	/// `policy`: the download/offline/insecure/assume_yes policy to apply to
	/// every HTTP fetch performed through this repository.
	#[must_use]
	pub fn new(project_root: PathBuf, cache_root: PathBuf, policy: RemotePolicy) -> Self {
		Self {
			fs: fs::PathFetcher::new(project_root),
			http: remote::HttpFetcher::new(cache_root, policy),
		}
	}
}

#[async_trait]
impl Fetcher for FetcherRepository {
	async fn fetch(&self, location: &Location, base_dir: &Path) -> Result<String> {
		match location {
			Location::Path(_) => self.fs.fetch(location, base_dir).await,
			Location::Http(url) => {
				if url.starts_with("http://") && !self.http.policy.insecure {
					return Err(eyre!(RunnerError::InsecureTransport { url: url.clone() }));
				}
				self.http.fetch(location, base_dir).await
			}
		}
	}
}
