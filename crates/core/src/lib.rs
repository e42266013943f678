//! Core types for ladle.
//!
//! This crate holds everything the resolution and restore layers share:
//!
//! - [`package`] - identity model (names, versions, references)
//! - [`manifest`] - recipe model and the [`manifest::ManifestReader`] collaborator
//! - [`lockfile`] - the persisted [`lockfile::PackageLock`] document
//! - [`store`] - on-disk layout of installed packages and generated locks
//! - [`config`] - user configuration and the language table
//! - [`Error`] - error taxonomy with `miette` diagnostics

#![warn(missing_docs)]

pub mod config;
mod error;
pub mod lockfile;
pub mod manifest;
pub mod package;
pub mod paths;
pub mod store;

pub use error::{Error, Result};

/// Filename of the recipe inside every package directory.
pub const RECIPE_FILE_NAME: &str = "Recipe.toml";
