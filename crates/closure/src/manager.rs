//! The restore pipeline: lock, install, then repeat for build dependencies.

use async_recursion::async_recursion;
use ladle_core::config::{Config, LanguageTable};
use ladle_core::lockfile::{LockedReference, PACKAGE_LOCK_FILE_NAME, PackageLock};
use ladle_core::manifest::{ManifestReader, TomlRecipeReader};
use ladle_core::store::{LockStore, PackageStore};
use ladle_core::{Error, Result, paths};
use ladle_store::{
    ArchiveExtractor, HttpContentService, PackageContentService, RestoreEngine, StagingDirectory,
    ZipExtractor,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::discovery::Discoverer;
use crate::lock_builder::build_package_lock;
use crate::resolve::{ClosureResolver, HttpClosureResolver, ResolutionClient};

/// External facilities the pipeline talks to.
pub struct Collaborators {
    /// Recipe loading.
    pub manifests: Arc<dyn ManifestReader>,
    /// Version resolution.
    pub resolver: Arc<dyn ClosureResolver>,
    /// Package archive downloads.
    pub content: Arc<dyn PackageContentService>,
    /// Archive unpacking.
    pub extractor: Arc<dyn ArchiveExtractor>,
}

impl Collaborators {
    /// Filesystem recipes, HTTP services at `api_endpoint` and zip archives.
    pub fn http(api_endpoint: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ladle/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            manifests: Arc::new(TomlRecipeReader),
            resolver: Arc::new(HttpClosureResolver::new(client.clone(), api_endpoint)?),
            content: Arc::new(HttpContentService::new(client, api_endpoint)?),
            extractor: Arc::new(ZipExtractor),
        })
    }
}

/// Restores the packages of a working directory and of every build
/// dependency it pulls in.
pub struct PackageManager {
    discoverer: Discoverer,
    resolution: ResolutionClient,
    restore: RestoreEngine,
    languages: LanguageTable,
    package_store: PackageStore,
    lock_store: LockStore,
}

impl PackageManager {
    /// Create a package manager from explicit parts.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        languages: LanguageTable,
        package_store: PackageStore,
        lock_store: LockStore,
    ) -> Self {
        Self {
            discoverer: Discoverer::new(collaborators.manifests, languages.build_language()),
            resolution: ResolutionClient::new(collaborators.resolver),
            restore: RestoreEngine::new(
                collaborators.content,
                collaborators.extractor,
                languages.clone(),
            ),
            languages,
            package_store,
            lock_store,
        }
    }

    /// Create a package manager talking to the services named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Collaborators::http(&config.api_endpoint())?,
            config.language_table(),
            PackageStore::new(config.package_store()?),
            LockStore::new(config.lock_store()?),
        ))
    }

    /// Restore every package needed to build `working_directory`.
    ///
    /// A staging directory private to this call is created on the first
    /// download and removed whether or not the restore succeeds. Nothing is
    /// written to the package store before a lock exists.
    ///
    /// # Errors
    ///
    /// Any discovery, resolution or restore failure aborts the whole run.
    /// A failed resolution never leaves a lock file behind.
    pub async fn restore_packages(&self, working_directory: &Path) -> Result<()> {
        let working_directory = std::path::absolute(working_directory)
            .map_err(|e| Error::io(e, working_directory, "resolve working directory"))?;
        let working_directory = paths::normalize(&working_directory);
        info!(directory = ?working_directory, "Restoring packages");

        let mut staging = StagingDirectory::new(&self.package_store);
        let mut processed = HashSet::new();
        let result = self
            .restore_recursive(
                &working_directory,
                &working_directory.join(PACKAGE_LOCK_FILE_NAME),
                &mut staging,
                &mut processed,
            )
            .await;
        let cleanup = staging.cleanup();

        result?;
        cleanup
    }

    /// Load the lock at `lock_path`, or generate and save it when it is
    /// missing or unusable.
    pub async fn ensure_package_lock(
        &self,
        working_directory: &Path,
        lock_path: &Path,
    ) -> Result<PackageLock> {
        debug!(?lock_path, "Ensure package lock exists");
        if let Some(lock) = PackageLock::try_load(lock_path)? {
            info!(?lock_path, "Restore from package lock");
            return Ok(lock);
        }

        info!(directory = ?working_directory, "Discovering full closure");
        let graph = self.discoverer.discover(working_directory).await?;
        let closures = self
            .resolution
            .resolve(&graph, &self.languages.preferred_versions())
            .await?;
        let lock = build_package_lock(working_directory, &closures, &self.languages)?;

        lock.save(lock_path)?;
        info!(?lock_path, "Saved package lock");
        Ok(lock)
    }

    #[async_recursion]
    async fn restore_recursive(
        &self,
        working_directory: &Path,
        lock_path: &Path,
        staging: &mut StagingDirectory,
        processed: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        if !processed.insert(lock_path.to_path_buf()) {
            debug!(?lock_path, "Package lock already processed");
            return Ok(());
        }

        let lock = self.ensure_package_lock(working_directory, lock_path).await?;
        self.restore
            .restore(&lock, &self.package_store, staging)
            .await?;

        // Build and tool dependencies need their own closures restored
        for closure in lock.closures.iter().filter(|c| !c.is_root()) {
            for (language_safe_name, package) in closure.packages() {
                let (directory, dependency_lock) = match package.reference()? {
                    LockedReference::Version(version) => {
                        if self.languages.is_pinned_extension(
                            language_safe_name,
                            &package.name,
                            &version,
                        ) {
                            debug!(name = %package.name, %version, "Skip built-in extension");
                            continue;
                        }
                        (
                            self.package_store.package_directory(
                                language_safe_name,
                                &package.name,
                                &version,
                            ),
                            self.lock_store
                                .lock_path(language_safe_name, &package.name, &version),
                        )
                    }
                    LockedReference::Path(path) => {
                        let directory = paths::normalize(&working_directory.join(path));
                        let dependency_lock = directory.join(PACKAGE_LOCK_FILE_NAME);
                        (directory, dependency_lock)
                    }
                };

                self.restore_recursive(&directory, &dependency_lock, staging, processed)
                    .await?;
            }
        }

        Ok(())
    }
}
