//! Restore engine: makes every public package of a lock present in the store.
//!
//! A package directory is only ever created by renaming a fully extracted
//! staging directory, so presence of the directory means a complete install.

use ladle_core::config::LanguageTable;
use ladle_core::lockfile::{LockedReference, PackageLock};
use ladle_core::package::{PackageName, SemanticVersion};
use ladle_core::store::{LOCAL_OWNER, PackageStore};
use ladle_core::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::content::PackageContentService;
use crate::extract::ArchiveExtractor;
use crate::staging::StagingDirectory;

/// What happened to one locked package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Built-in extension at its pinned version, nothing to install.
    BuiltIn,
    /// The store already contained the package.
    AlreadyInstalled,
    /// Downloaded and installed during this run.
    Installed,
}

/// Counts of a restore run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Packages downloaded and installed.
    pub installed: usize,
    /// Packages that were already present.
    pub already_installed: usize,
    /// Built-in extensions that were skipped.
    pub built_in: usize,
    /// Local packages, which are never installed.
    pub local: usize,
}

impl RestoreSummary {
    fn record(&mut self, outcome: InstallOutcome) {
        match outcome {
            InstallOutcome::BuiltIn => self.built_in += 1,
            InstallOutcome::AlreadyInstalled => self.already_installed += 1,
            InstallOutcome::Installed => self.installed += 1,
        }
    }
}

/// Installs locked packages into a [`PackageStore`].
pub struct RestoreEngine {
    content: Arc<dyn PackageContentService>,
    extractor: Arc<dyn ArchiveExtractor>,
    languages: LanguageTable,
}

impl RestoreEngine {
    /// Create a restore engine.
    #[must_use]
    pub fn new(
        content: Arc<dyn PackageContentService>,
        extractor: Arc<dyn ArchiveExtractor>,
        languages: LanguageTable,
    ) -> Self {
        Self {
            content,
            extractor,
            languages,
        }
    }

    /// Install every public package of every closure in `lock`.
    ///
    /// Packages installed before a failure stay installed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageVersionMissing`] when a locked version is no
    /// longer published and stops at the first failing package.
    pub async fn restore(
        &self,
        lock: &PackageLock,
        store: &PackageStore,
        staging: &mut StagingDirectory,
    ) -> Result<RestoreSummary> {
        let mut summary = RestoreSummary::default();
        for closure in &lock.closures {
            debug!(closure = %closure.name, "Restoring closure");
            for (language_safe_name, package) in closure.packages() {
                match package.reference()? {
                    LockedReference::Path(path) => {
                        debug!(name = %package.name, path, "Skipping local package");
                        summary.local += 1;
                    }
                    LockedReference::Version(version) => {
                        let outcome = self
                            .ensure_installed(
                                language_safe_name,
                                &package.name,
                                &version,
                                store,
                                staging,
                            )
                            .await?;
                        summary.record(outcome);
                    }
                }
            }
        }

        info!(
            installed = summary.installed,
            already_installed = summary.already_installed,
            built_in = summary.built_in,
            "Restore complete"
        );
        Ok(summary)
    }

    /// Ensure a single public package version is installed.
    ///
    /// The staging directory is only created once an archive has been
    /// downloaded.
    pub async fn ensure_installed(
        &self,
        language_safe_name: &str,
        name: &PackageName,
        version: &SemanticVersion,
        store: &PackageStore,
        staging: &mut StagingDirectory,
    ) -> Result<InstallOutcome> {
        if self
            .languages
            .is_pinned_extension(language_safe_name, name, version)
        {
            debug!(%name, %version, "Skipping built-in extension");
            return Ok(InstallOutcome::BuiltIn);
        }

        if store.is_installed(language_safe_name, name, version) {
            debug!(%name, %version, "Package already installed");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        info!(%name, %version, "Installing package");
        let language = self.languages.name_from_safe(language_safe_name)?;
        let bytes = self.content.download(language, name, version).await?;
        let staging = staging.path()?;

        let stem = format!(
            "{}_{}_{}_{}",
            language_safe_name,
            name.owner.as_deref().unwrap_or(LOCAL_OWNER),
            name.name,
            version
        );
        let archive = staging.join(format!("{}.zip", stem));
        tokio::fs::write(&archive, &bytes)
            .await
            .map_err(|e| Error::io(e, &archive, "write archive"))?;

        let extracted = staging.join(&stem);
        let result = self.extract(&archive, &extracted);
        if let Err(e) = tokio::fs::remove_file(&archive).await {
            warn!(?archive, error = %e, "Failed to remove downloaded archive");
        }
        if let Err(e) = result {
            remove_extraction(&extracted).await;
            return Err(e);
        }

        let target = store.package_directory(language_safe_name, name, version);
        move_into_store(&extracted, &target).await?;
        Ok(InstallOutcome::Installed)
    }

    fn extract(&self, archive: &Path, destination: &Path) -> Result<()> {
        std::fs::create_dir_all(destination)
            .map_err(|e| Error::io(e, destination, "create extraction directory"))?;
        self.extractor.extract(archive, destination)
    }
}

async fn move_into_store(extracted: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(e, parent, "create package directory"))?;
    }

    match tokio::fs::rename(extracted, target).await {
        Ok(()) => Ok(()),
        // Another run installed the same package first
        Err(_) if target.exists() => {
            debug!(?target, "Package installed concurrently");
            remove_extraction(extracted).await;
            Ok(())
        }
        Err(e) => Err(Error::io(e, target, "move package into store")),
    }
}

async fn remove_extraction(extracted: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(extracted).await {
        warn!(?extracted, error = %e, "Failed to remove extraction directory");
    }
}
