//! Package lock document.
//!
//! The lock (`PackageLock.toml`) records a fully resolved closure so later
//! runs can skip discovery and resolution. It is the only persisted artifact
//! of the resolution pipeline.
//!
//! ## Structure
//!
//! ```toml
//! version = 5
//!
//! [[closures]]
//! name = "Root"
//!
//! [[closures.languages.Cpp]]
//! name = "App"
//! path = "./"
//! build = "Build0"
//! tool = "Tool0"
//!
//! [[closures]]
//! name = "Build0"
//!
//! [[closures.languages.Wren]]
//! name = "mwasplund|Soup.Cpp"
//! version = "0.8.2"
//! ```
//!
//! Closures are stored root first, then build closures, then tool closures.
//! Languages are keyed by their safe name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::package::{PackageName, SemanticVersion};
use crate::{Error, Result};

/// Current lock format version.
pub const PACKAGE_LOCK_VERSION: u32 = 5;

/// Filename for the lock document.
pub const PACKAGE_LOCK_FILE_NAME: &str = "PackageLock.toml";

/// Reserved name of the runtime closure.
pub const ROOT_CLOSURE_NAME: &str = "Root";

/// The root lock document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageLock {
    /// Lock format version.
    pub version: u32,
    /// Named closures, root first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub closures: Vec<LockedClosure>,
}

/// One named closure: language safe name to locked packages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedClosure {
    /// Closure name.
    pub name: String,
    /// Packages per language safe name, each list sorted by package name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub languages: BTreeMap<String, Vec<LockedPackage>>,
}

/// A single locked package.
///
/// Exactly one of `version` (public) and `path` (local) is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedPackage {
    /// Full package name.
    pub name: PackageName,
    /// Resolved version of a public package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<SemanticVersion>,
    /// Working-directory relative path of a local package.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Build closure applying to this package (root closure only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Tool closure applying to this package (root closure only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// What a locked package points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockedReference<'a> {
    /// A published version.
    Version(SemanticVersion),
    /// A workspace-relative directory.
    Path(&'a str),
}

impl LockedPackage {
    /// Lock a public package version.
    #[must_use]
    pub fn public(name: PackageName, version: SemanticVersion) -> Self {
        Self {
            name,
            version: Some(version),
            path: None,
            build: None,
            tool: None,
        }
    }

    /// Lock a local package path.
    #[must_use]
    pub fn local(name: PackageName, path: impl Into<String>) -> Self {
        Self {
            name,
            version: None,
            path: Some(path.into()),
            build: None,
            tool: None,
        }
    }

    /// Attach build and tool closure names.
    #[must_use]
    pub fn with_closures(mut self, build: Option<String>, tool: Option<String>) -> Self {
        self.build = build;
        self.tool = tool;
        self
    }

    /// The locked reference.
    ///
    /// # Errors
    ///
    /// Returns an internal error unless exactly one of version and path is set.
    pub fn reference(&self) -> Result<LockedReference<'_>> {
        match (&self.version, &self.path) {
            (Some(version), None) => Ok(LockedReference::Version(*version)),
            (None, Some(path)) => Ok(LockedReference::Path(path)),
            _ => Err(Error::internal(format!(
                "Locked package '{}' must have exactly one of version or path",
                self.name
            ))),
        }
    }
}

impl LockedClosure {
    /// Whether this is the runtime closure.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.name == ROOT_CLOSURE_NAME
    }

    /// Iterate `(language safe name, package)` pairs.
    pub fn packages(&self) -> impl Iterator<Item = (&str, &LockedPackage)> {
        self.languages
            .iter()
            .flat_map(|(language, packages)| packages.iter().map(move |p| (language.as_str(), p)))
    }
}

impl Default for PackageLock {
    fn default() -> Self {
        Self {
            version: PACKAGE_LOCK_VERSION,
            closures: Vec::new(),
        }
    }
}

impl PackageLock {
    /// Create a new empty lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a closure by name.
    #[must_use]
    pub fn closure(&self, name: &str) -> Option<&LockedClosure> {
        self.closures.iter().find(|c| c.name == name)
    }

    /// The runtime closure, if present.
    #[must_use]
    pub fn root_closure(&self) -> Option<&LockedClosure> {
        self.closure(ROOT_CLOSURE_NAME)
    }

    /// Get or append a closure, preserving insertion order.
    pub fn ensure_closure(&mut self, name: &str) -> &mut LockedClosure {
        let index = match self.closures.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.closures.push(LockedClosure {
                    name: name.to_string(),
                    languages: BTreeMap::new(),
                });
                self.closures.len() - 1
            }
        };
        &mut self.closures[index]
    }

    /// Append a package to a closure under a language safe name.
    pub fn add_package(&mut self, closure: &str, language: &str, package: LockedPackage) {
        self.ensure_closure(closure)
            .languages
            .entry(language.to_string())
            .or_default()
            .push(package);
    }

    /// Check the document invariants.
    ///
    /// Every package has exactly one reference kind and every closure name
    /// referenced from the root closure exists.
    pub fn validate(&self) -> Result<()> {
        for closure in &self.closures {
            for (_, package) in closure.packages() {
                package.reference()?;
            }
        }

        if let Some(root) = self.root_closure() {
            for (_, package) in root.packages() {
                for name in [&package.build, &package.tool].into_iter().flatten() {
                    if self.closure(name).is_none() {
                        return Err(Error::internal(format!(
                            "Package '{}' references missing closure '{}'",
                            package.name, name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            Error::internal(format!("Failed to serialize package lock: {}", e))
        })
    }

    /// Load a lock from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist, cannot be parsed, has a
    /// different format version or breaks the document invariants; all of
    /// these mean the closure has to be discovered again.
    pub fn try_load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!(?path, "No package lock");
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(e, path, "read package lock"))?;

        let lock: Self = match toml::from_str(&content) {
            Ok(lock) => lock,
            Err(e) => {
                warn!(?path, error = %e, "Ignoring unreadable package lock");
                return Ok(None);
            }
        };

        if lock.version != PACKAGE_LOCK_VERSION {
            warn!(
                ?path,
                found = lock.version,
                expected = PACKAGE_LOCK_VERSION,
                "Ignoring package lock with incompatible version"
            );
            return Ok(None);
        }

        if let Err(e) = lock.validate() {
            warn!(?path, error = %e, "Ignoring inconsistent package lock");
            return Ok(None);
        }

        Ok(Some(lock))
    }

    /// Save the lock to a TOML file, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string().map_err(|e| Error::Lockfile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(e, parent, "create lock directory"))?;
        }
        std::fs::write(path, content).map_err(|e| Error::io(e, path, "write package lock"))?;
        debug!(?path, "Saved package lock");
        Ok(())
    }
}
