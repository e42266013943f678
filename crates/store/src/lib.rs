//! Restore engine for ladle.
//!
//! Given a [`ladle_core::lockfile::PackageLock`], this crate makes every
//! public package it names present in the package store. Archives come from
//! a [`PackageContentService`], are unpacked by an [`ArchiveExtractor`] into
//! a [`StagingDirectory`] and only then moved to their final location.

#![warn(missing_docs)]

mod content;
mod extract;
mod restore;
mod staging;

pub use content::{HttpContentService, PackageContentService};
pub use extract::{ArchiveExtractor, ZipExtractor};
pub use restore::{InstallOutcome, RestoreEngine, RestoreSummary};
pub use staging::StagingDirectory;
