//! Scratch directory for temporary asset exports
//!
//! Video transcodes are written here by the asset library during export.
//! The directory is fully cleared at the start of every sync run; the next
//! run's cleanup is the recovery mechanism for crashes mid-export.

use std::io;
use std::path::{Path, PathBuf};

use crate::logging::*;

#[derive(Debug)]
pub struct ScratchDir {
	path: PathBuf,
}

impl ScratchDir {
	/// Wipe and recreate the scratch directory
	pub async fn prepare(path: &Path) -> io::Result<Self> {
		match tokio::fs::remove_dir_all(path).await {
			Ok(()) => debug!("Cleared scratch directory {}", path.display()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => {}
			Err(e) => return Err(e),
		}
		tokio::fs::create_dir_all(path).await?;
		Ok(ScratchDir { path: path.to_path_buf() })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}


// vim: ts=4
