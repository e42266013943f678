//! Error types shared by every ladle crate.
//!
//! Variants fall into four groups:
//! - input errors (bad recipes, bad references, missing tool metadata)
//! - service errors (resolution rejected, service unreachable)
//! - missing-version errors (a published version was removed)
//! - internal-consistency errors (protocol or logic defects)
//!
//! Service and missing-version errors are *handled*: they are expected
//! outcomes that get reported to the user, see [`Error::is_handled`].

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for ladle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering, resolving, locking or restoring packages.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Recipe file does not exist.
    #[error("Recipe file not found: {}", path.display())]
    #[diagnostic(
        code(ladle::recipe::not_found),
        help("Ensure every local dependency points at a directory containing a Recipe.toml")
    )]
    RecipeNotFound {
        /// Path of the missing recipe.
        path: PathBuf,
    },

    /// Recipe file exists but could not be understood.
    #[error("Invalid recipe {}: {message}", path.display())]
    #[diagnostic(
        code(ladle::recipe::invalid),
        help("Check the recipe for syntax errors or missing required fields")
    )]
    InvalidRecipe {
        /// Path of the invalid recipe.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// A dependency reference string could not be parsed.
    #[error("Invalid package reference '{reference}': {message}")]
    #[diagnostic(
        code(ladle::reference::invalid),
        help("Public references look like '[Language]owner|name@1.2.3', local references are relative paths")
    )]
    InvalidReference {
        /// The reference as written.
        reference: String,
        /// What is wrong with it.
        message: String,
    },

    /// A tool dependency was declared without an explicit language or owner.
    #[error("Tool dependency '{reference}' in {} must declare both a language and an owner", recipe.display())]
    #[diagnostic(
        code(ladle::reference::incomplete_tool),
        help("Tool dependencies have no implicit language, write them as '[Language]owner|name@version'")
    )]
    IncompleteToolReference {
        /// The reference as written.
        reference: String,
        /// Recipe that declared it.
        recipe: PathBuf,
    },

    /// A language that ladle has no configuration for.
    #[error("Unknown language: {name}")]
    #[diagnostic(
        code(ladle::language::unknown),
        help("Add the language to the 'languages' table of the ladle configuration")
    )]
    UnknownLanguage {
        /// The language name or safe name.
        name: String,
    },

    /// The resolution service returned a non-success result.
    #[error("Package resolution failed: {message}")]
    #[diagnostic(
        code(ladle::resolve::rejected),
        help("Adjust the requested versions so a compatible closure exists")
    )]
    ResolutionRejected {
        /// Message returned by the service.
        message: String,
    },

    /// The package service could not be reached or answered with an unexpected status.
    #[error("Package service request failed: {message}")]
    #[diagnostic(
        code(ladle::service::unavailable),
        help("Check network connectivity and the configured apiEndpoint")
    )]
    ServiceUnavailable {
        /// Transport or status description.
        message: String,
    },

    /// A locked package version is no longer published.
    #[error("Package version missing: {language} {name}@{version}")]
    #[diagnostic(
        code(ladle::restore::version_missing),
        help("Delete the package lock to resolve the closure again")
    )]
    PackageVersionMissing {
        /// Package language.
        language: String,
        /// Full package name.
        name: String,
        /// Requested version.
        version: String,
    },

    /// A broken invariant between ladle and the service, or inside ladle itself.
    #[error("Internal consistency error: {message}")]
    #[diagnostic(code(ladle::internal))]
    Internal {
        /// Description of the broken invariant.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(ladle::config))]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// Lock document could not be written or serialized.
    #[error("Package lock error at {}: {message}", path.display())]
    #[diagnostic(code(ladle::lock::write))]
    Lockfile {
        /// Path of the lock document.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Archive could not be extracted.
    #[error("Failed to extract archive {}: {message}", path.display())]
    #[diagnostic(
        code(ladle::restore::extract),
        help("The downloaded archive may be corrupted, run the restore again")
    )]
    Extraction {
        /// Archive path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// I/O error.
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(ladle::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available.
        path: Option<Box<Path>>,
        /// Operation that failed.
        operation: String,
    },
}

impl Error {
    /// Create an I/O error with path context.
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an invalid reference error.
    #[must_use]
    pub fn invalid_reference(reference: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            message: message.into(),
        }
    }

    /// Create an invalid recipe error.
    #[must_use]
    pub fn invalid_recipe(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidRecipe {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal consistency error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a service unavailable error.
    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this is an expected failure that was already explained to the user.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(
            self,
            Self::ResolutionRejected { .. }
                | Self::ServiceUnavailable { .. }
                | Self::PackageVersionMissing { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}
