//! Layout of the installed package store and the lock store.
//!
//! ```text
//! ~/.soup/packages/
//! ├── .stagingXXXXXX/           # scratch space of one restore run
//! └── Cpp/
//!     └── mwasplund/
//!         └── json11/
//!             └── 1.1.0/        # installed package content
//! ~/.soup/locks/
//! └── Wren/mwasplund/Soup.Cpp/0.8.2/PackageLock.toml
//! ```
//!
//! Directory presence is the only existence check.

use std::path::{Path, PathBuf};

use crate::lockfile::PACKAGE_LOCK_FILE_NAME;
use crate::package::{PackageName, SemanticVersion};

/// Owner directory used for packages without an owner.
pub const LOCAL_OWNER: &str = "local";

/// Name prefix of the per-run staging directories inside the package store.
pub const STAGING_PREFIX: &str = ".staging";

/// Identity-addressed store of installed packages.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Create a store at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Install directory for a package version.
    #[must_use]
    pub fn package_directory(
        &self,
        language_safe_name: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> PathBuf {
        identity_path(&self.root, language_safe_name, name, version)
    }

    /// Whether a package version is installed.
    #[must_use]
    pub fn is_installed(
        &self,
        language_safe_name: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> bool {
        self.package_directory(language_safe_name, name, version)
            .exists()
    }
}

/// Store of locks generated for installed build dependencies.
#[derive(Debug, Clone)]
pub struct LockStore {
    root: PathBuf,
}

impl LockStore {
    /// Create a lock store at the specified root directory.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Lock path for an installed package version.
    #[must_use]
    pub fn lock_path(
        &self,
        language_safe_name: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> PathBuf {
        identity_path(&self.root, language_safe_name, name, version).join(PACKAGE_LOCK_FILE_NAME)
    }
}

fn identity_path(
    root: &Path,
    language_safe_name: &str,
    name: &PackageName,
    version: &SemanticVersion,
) -> PathBuf {
    root.join(language_safe_name)
        .join(name.owner.as_deref().unwrap_or(LOCAL_OWNER))
        .join(&name.name)
        .join(version.to_string())
}
