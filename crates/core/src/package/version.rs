use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A semantic version where the minor and patch parts may be left unspecified.
///
/// Recipes may pin only `1` or `1.2`; anything sent to resolution or written to
/// a lock is zero-filled first with [`SemanticVersion::fill_defaults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticVersion {
    /// Major version.
    pub major: u32,
    /// Minor version, if specified.
    pub minor: Option<u32>,
    /// Patch version, if specified.
    pub patch: Option<u32>,
}

impl SemanticVersion {
    /// Create a fully specified version.
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
            patch: Some(patch),
        }
    }

    /// Create a version with only the major part set.
    #[must_use]
    pub fn major_only(major: u32) -> Self {
        Self {
            major,
            minor: None,
            patch: None,
        }
    }

    /// Zero-fill the missing parts.
    #[must_use]
    pub fn fill_defaults(self) -> Self {
        Self::new(self.major, self.minor.unwrap_or(0), self.patch.unwrap_or(0))
    }
}

impl FromStr for SemanticVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |message: &str| Error::invalid_reference(s, message);

        let mut parts = s.split('.');
        let mut next = |required: bool| -> Result<Option<u32>> {
            match parts.next() {
                Some(part) => part
                    .parse::<u32>()
                    .map(Some)
                    .map_err(|_| invalid("version parts must be unsigned integers")),
                None if required => Err(invalid("version requires a major part")),
                None => Ok(None),
            }
        };

        let major = next(true)?.ok_or_else(|| invalid("version requires a major part"))?;
        let minor = next(false)?;
        let patch = if minor.is_some() { next(false)? } else { None };

        if parts.next().is_some() {
            return Err(invalid("version has more than three parts"));
        }

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_versions() {
        let v: SemanticVersion = "1".parse().unwrap();
        assert_eq!(v, SemanticVersion::major_only(1));

        let v: SemanticVersion = "1.2".parse().unwrap();
        assert_eq!(v.minor, Some(2));
        assert_eq!(v.patch, None);

        let v: SemanticVersion = "1.2.3".parse().unwrap();
        assert_eq!(v, SemanticVersion::new(1, 2, 3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<SemanticVersion>().is_err());
        assert!("1.x".parse::<SemanticVersion>().is_err());
        assert!("1.2.3.4".parse::<SemanticVersion>().is_err());
        assert!("./Lib/".parse::<SemanticVersion>().is_err());
    }

    #[test]
    fn test_fill_defaults() {
        assert_eq!(
            SemanticVersion::major_only(4).fill_defaults(),
            SemanticVersion::new(4, 0, 0)
        );
        let partial: SemanticVersion = "1.2".parse().unwrap();
        assert_eq!(partial.fill_defaults().to_string(), "1.2.0");
    }

    #[test]
    fn test_display_keeps_specified_parts() {
        assert_eq!(SemanticVersion::major_only(3).to_string(), "3");
        assert_eq!(SemanticVersion::new(0, 8, 2).to_string(), "0.8.2");
    }
}
