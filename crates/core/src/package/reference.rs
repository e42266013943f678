use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{PackageName, SemanticVersion};
use crate::{Error, Result};

/// A dependency as declared in a recipe: either a path to another recipe
/// directory, or a public package requested by name and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageReference {
    /// A package living in the workspace.
    Local {
        /// Path to the package directory, relative to the declaring recipe unless rooted.
        path: PathBuf,
    },
    /// A package published to the package service.
    Public {
        /// Explicit language, if declared.
        language: Option<String>,
        /// Owner, if declared.
        owner: Option<String>,
        /// Package name.
        name: String,
        /// Requested version, possibly partial.
        version: Option<SemanticVersion>,
    },
}

impl PackageReference {
    /// Create a local reference.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local { path: path.into() }
    }

    /// Resolve a local path against the directory of the declaring recipe.
    ///
    /// Rooted paths are returned unchanged; public references return `None`.
    #[must_use]
    pub fn resolve_path(&self, recipe_directory: &Path) -> Option<PathBuf> {
        match self {
            Self::Local { path } if path.has_root() => Some(path.clone()),
            Self::Local { path } => Some(recipe_directory.join(path)),
            Self::Public { .. } => None,
        }
    }
}

/// Whether reference text names a path rather than a public package.
fn is_path_syntax(value: &str) -> bool {
    value.starts_with('.') || value.starts_with('/') || value.contains('/') || value.contains('\\')
}

impl FromStr for PackageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.is_empty() {
            return Err(Error::invalid_reference(s, "reference must not be empty"));
        }

        if is_path_syntax(value) {
            return Ok(Self::local(value));
        }

        let (language, rest) = match value.strip_prefix('[') {
            Some(stripped) => {
                let (language, rest) = stripped
                    .split_once(']')
                    .ok_or_else(|| Error::invalid_reference(s, "unterminated language"))?;
                if language.is_empty() {
                    return Err(Error::invalid_reference(s, "language must not be empty"));
                }
                (Some(language.to_string()), rest)
            }
            None => (None, value),
        };

        let (name, version) = match rest.split_once('@') {
            Some((name, version)) => (name, Some(version.parse::<SemanticVersion>()?)),
            None => (rest, None),
        };

        let name: PackageName = name.parse()?;
        Ok(Self::Public {
            language,
            owner: name.owner,
            name: name.name,
            version,
        })
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::Public {
                language,
                owner,
                name,
                version,
            } => {
                if let Some(language) = language {
                    write!(f, "[{language}]")?;
                }
                write!(f, "{}", PackageName::new(owner.clone(), name.clone()))?;
                if let Some(version) = version {
                    write!(f, "@{version}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_references() {
        assert_eq!(
            "../Lib".parse::<PackageReference>().unwrap(),
            PackageReference::local("../Lib")
        );
        for text in ["./", "/abs/Lib", "Libs/Core"] {
            assert!(matches!(
                text.parse::<PackageReference>().unwrap(),
                PackageReference::Local { .. }
            ));
        }
    }

    #[test]
    fn test_parse_public_references() {
        let reference: PackageReference = "[C++]mwasplund|copy@1.2".parse().unwrap();
        assert_eq!(
            reference,
            PackageReference::Public {
                language: Some("C++".into()),
                owner: Some("mwasplund".into()),
                name: "copy".into(),
                version: Some("1.2".parse().unwrap()),
            }
        );
        assert_eq!(reference.to_string(), "[C++]mwasplund|copy@1.2");

        let reference: PackageReference = "json11".parse().unwrap();
        assert_eq!(
            reference,
            PackageReference::Public {
                language: None,
                owner: None,
                name: "json11".into(),
                version: None,
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<PackageReference>().is_err());
        assert!("[C++".parse::<PackageReference>().is_err());
        assert!("[]name@1".parse::<PackageReference>().is_err());
        assert!("name@one".parse::<PackageReference>().is_err());
    }

    #[test]
    fn test_resolve_path() {
        let reference = PackageReference::local("../Lib");
        assert_eq!(
            reference.resolve_path(Path::new("/work/App")),
            Some(PathBuf::from("/work/App/../Lib"))
        );

        let rooted = PackageReference::local("/shared/Lib");
        assert_eq!(
            rooted.resolve_path(Path::new("/work/App")),
            Some(PathBuf::from("/shared/Lib"))
        );
    }
}
