//! Fetches taskfile bodies from the local filesystem.

use crate::fetch::{Fetcher, Location};
use async_trait::async_trait;
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use std::path::{Path, PathBuf};

/// Handles fetching based on a `path` location.
///
/// Only allows fetching from within the project root, for the same reason
/// the teacher's `PathFetcher` restricts it: a path outside the project
/// directory may not exist on every machine that checks this taskfile tree
/// out.
#[derive(Debug)]
pub struct PathFetcher {
	project_root: PathBuf,
}

/// Determines if a path is a child of a parent (or equal to it).
#[must_use]
pub fn path_is_child_of_parent(parent: &Path, child: &Path) -> bool {
	child.starts_with(parent)
}

impl PathFetcher {
	#[must_use]
	pub fn new(project_root: PathBuf) -> Self {
		Self { project_root }
	}
}

#[async_trait]
impl Fetcher for PathFetcher {
	async fn fetch(&self, location: &Location, base_dir: &Path) -> Result<String> {
		let Location::Path(raw) = location else {
			return Err(eyre!("PathFetcher given a non-path location: {:?}", location));
		};

		let mut built_path = base_dir.to_path_buf();
		built_path.push(raw);

		let canonicalized = async_std::fs::canonicalize(&built_path)
			.await
			.wrap_err_with(|| format!("failed to resolve taskfile path {:?}", built_path))?;

		if !path_is_child_of_parent(&self.project_root, &canonicalized) {
			return Err(eyre!(
				"path {:?} is not a child of the project root {:?}; refusing to read it",
				canonicalized,
				self.project_root,
			));
		}

		async_std::fs::read_to_string(&canonicalized)
			.await
			.wrap_err_with(|| format!("failed to read taskfile {:?}", canonicalized))
	}
}
