use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Separator between owner and name in the text form `owner|name`.
pub const OWNER_SEPARATOR: char = '|';

/// A package name with an optional owner.
///
/// Local packages have no owner; public packages always carry one once they
/// come back from resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName {
    /// Owner of the package, if any.
    pub owner: Option<String>,
    /// Package name.
    pub name: String,
}

impl PackageName {
    /// Create a name with an optional owner.
    #[must_use]
    pub fn new(owner: Option<String>, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }

    /// Create an owner-less name.
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self::new(None, name)
    }

    /// Create a name with an owner.
    #[must_use]
    pub fn owned(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Some(owner.into()), name)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{owner}{OWNER_SEPARATOR}{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl FromStr for PackageName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (owner, name) = match s.split_once(OWNER_SEPARATOR) {
            Some((owner, name)) => {
                if owner.is_empty() {
                    return Err(Error::invalid_reference(s, "owner must not be empty"));
                }
                (Some(owner.to_string()), name)
            }
            None => (None, s),
        };

        if name.is_empty() {
            return Err(Error::invalid_reference(s, "name must not be empty"));
        }
        if name.contains(OWNER_SEPARATOR) || name.chars().any(char::is_whitespace) {
            return Err(Error::invalid_reference(s, "name contains invalid characters"));
        }

        Ok(Self::new(owner, name))
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
