//! Package identity model.
//!
//! Plain value types shared by discovery, resolution, locking and restore.
//! They carry no behavior beyond parsing, formatting and equality.

mod language;
mod name;
mod reference;
mod version;

pub use language::{DependencyCategory, LanguageReference};
pub use name::{OWNER_SEPARATOR, PackageName};
pub use reference::PackageReference;
pub use version::SemanticVersion;

/// Identifier of a package within a single discovery run.
///
/// Drawn from one counter shared by local and public packages and never persisted.
pub type PackageId = u32;
