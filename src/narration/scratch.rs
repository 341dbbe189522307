//! Per-job scratch directory.
//!
//! The directory is removed when the [`ScratchArea`] is discarded or dropped.
//! With `retain_on_failure` set, an area that is dropped without having been
//! discarded (an aborted job) is left on disk and its path logged.

use crate::defaults;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug)]
pub struct ScratchArea {
    dir: Option<TempDir>,
    path: PathBuf,
    retain_on_failure: bool,
}

impl ScratchArea {
    /// Create a fresh directory under `root`.
    pub fn create(root: &Path, retain_on_failure: bool) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(defaults::SCRATCH_PREFIX)
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "Created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
            retain_on_failure,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the directory and everything in it.
    pub fn discard(mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            dir.close()?;
            tracing::debug!(path = %self.path.display(), "Removed scratch directory");
        }
        Ok(())
    }
}

impl Drop for ScratchArea {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.retain_on_failure {
            let kept = dir.keep();
            tracing::warn!(path = %kept.display(), "Keeping scratch directory of failed job");
        }
        // otherwise TempDir's own drop removes it
    }
}
