//! Closure discovery, resolution and package lock generation.
//!
//! The pipeline runs in four steps:
//!
//! 1. [`Discoverer`] walks the recipes reachable from a working directory
//! 2. [`ResolutionClient`] asks the resolution service for a closure
//! 3. [`build_package_lock`] turns the answer into a [`ladle_core::lockfile::PackageLock`]
//! 4. [`PackageManager`] saves the lock and restores it with [`ladle_store::RestoreEngine`]
//!
//! When a usable lock already exists only the last step runs.

#![warn(missing_docs)]

mod discovery;
mod lock_builder;
mod manager;
pub mod resolve;

pub use discovery::{DiscoveredGraph, Discoverer, LocalPackageRecord, PublicPackageRecord};
pub use lock_builder::build_package_lock;
pub use manager::{Collaborators, PackageManager};
pub use resolve::{
    ClosureResolver, HttpClosureResolver, ResolutionClient, ResolvedClosure, ResolvedClosures,
    ResolvedEntry, ResolvedReference,
};
