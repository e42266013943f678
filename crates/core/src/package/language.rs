use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SemanticVersion;
use crate::{Error, Result};

/// The language a recipe is written in, plus the version of the language
/// extension that builds it (`C++|0.8.2`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageReference {
    /// Language name (e.g. `C++`).
    pub name: String,
    /// Requested language extension version.
    pub version: SemanticVersion,
}

impl LanguageReference {
    /// Create a language reference.
    #[must_use]
    pub fn new(name: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl FromStr for LanguageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, version) = s
            .split_once('|')
            .ok_or_else(|| Error::invalid_reference(s, "language must be 'Name|Version'"))?;
        if name.is_empty() {
            return Err(Error::invalid_reference(s, "language name must not be empty"));
        }
        Ok(Self::new(name, version.parse()?))
    }
}

impl fmt::Display for LanguageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.version)
    }
}

/// The kind of a dependency edge.
///
/// Categories other than build and tool behave like runtime dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DependencyCategory {
    /// Runtime dependency, inherits the declaring recipe's language.
    Runtime,
    /// Build extension dependency, defaults to the build language.
    Build,
    /// Tool dependency, must declare language and owner explicitly.
    Tool,
    /// Any other named category, treated like runtime.
    Other(String),
}

impl DependencyCategory {
    /// Category name as written in recipes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Runtime => "Runtime",
            Self::Build => "Build",
            Self::Tool => "Tool",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for DependencyCategory {
    fn from(value: &str) -> Self {
        match value {
            "Runtime" => Self::Runtime,
            "Build" => Self::Build,
            "Tool" => Self::Tool,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DependencyCategory {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<DependencyCategory> for String {
    fn from(value: DependencyCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DependencyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_reference_parse() {
        let language: LanguageReference = "C++|0.8.2".parse().unwrap();
        assert_eq!(language.name, "C++");
        assert_eq!(language.version, SemanticVersion::new(0, 8, 2));
        assert!("C++".parse::<LanguageReference>().is_err());
        assert!("|1".parse::<LanguageReference>().is_err());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(DependencyCategory::from("Build"), DependencyCategory::Build);
        assert_eq!(
            DependencyCategory::from("Test"),
            DependencyCategory::Other("Test".into())
        );
        assert_eq!(DependencyCategory::Tool.to_string(), "Tool");
    }
}
