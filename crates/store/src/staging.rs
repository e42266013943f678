//! Scratch directory for downloads and extraction.

use ladle_core::store::{PackageStore, STAGING_PREFIX};
use ladle_core::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Owns the staging directory of one restore run.
///
/// Each run gets its own `.staging*` directory inside the package store, so
/// concurrent runs against one store never touch each other's scratch files.
/// Nothing is created on disk until [`StagingDirectory::path`] is first
/// called. The directory is removed by [`StagingDirectory::cleanup`], or on
/// drop if the run ended early with an error.
#[derive(Debug)]
pub struct StagingDirectory {
    store_root: PathBuf,
    dir: Option<TempDir>,
}

impl StagingDirectory {
    /// Staging for installs into `store`.
    #[must_use]
    pub fn new(store: &PackageStore) -> Self {
        Self {
            store_root: store.root().to_path_buf(),
            dir: None,
        }
    }

    /// Path of the staging directory, creating it on first use.
    pub fn path(&mut self) -> Result<&Path> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => {
                std::fs::create_dir_all(&self.store_root)
                    .map_err(|e| Error::io(e, &self.store_root, "create package store"))?;
                let dir = tempfile::Builder::new()
                    .prefix(STAGING_PREFIX)
                    .tempdir_in(&self.store_root)
                    .map_err(|e| Error::io(e, &self.store_root, "create staging directory"))?;
                debug!(path = ?dir.path(), "Created staging directory");
                dir
            }
        };
        Ok(self.dir.insert(dir).path())
    }

    /// Whether the staging directory has been created.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.dir.is_some()
    }

    /// Remove the staging directory.
    pub fn cleanup(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => remove(dir),
            None => Ok(()),
        }
    }
}

impl Drop for StagingDirectory {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take()
            && let Err(e) = remove(dir)
        {
            warn!(error = %e, "Failed to remove staging directory");
        }
    }
}

fn remove(dir: TempDir) -> Result<()> {
    let path = dir.path().to_path_buf();
    dir.close()
        .map_err(|e| Error::io(e, &path, "remove staging directory"))
}
