//! Configuration for ladle.
//!
//! Loaded from `config.toml` in [`crate::paths::config_dir`]. Every key is
//! optional; accessors fall back to the built-in defaults.
//!
//! ```toml
//! apiEndpoint = "https://api.soupbuild.com"
//! packageStore = "/home/me/.soup/packages"
//! buildLanguage = "Wren"
//!
//! [[languages]]
//! name = "C++"
//! safeName = "Cpp"
//! extension = "mwasplund|Soup.Cpp"
//! version = "0.8.2"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::package::{PackageName, SemanticVersion};
use crate::{Error, Result, paths};

/// Default service endpoint for resolution and package downloads.
pub const DEFAULT_API_ENDPOINT: &str = "https://api.soupbuild.com";

/// Default implicit language of build dependencies.
pub const DEFAULT_BUILD_LANGUAGE: &str = "Wren";

/// Environment variable overriding the configured endpoint.
pub const API_ENDPOINT_ENV: &str = "LADLE_API_ENDPOINT";

/// Main configuration structure for ladle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the package service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,

    /// Root of the installed package store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_store: Option<PathBuf>,

    /// Root of the store for locks generated for installed build dependencies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_store: Option<PathBuf>,

    /// Language implied for build dependencies that do not declare one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_language: Option<String>,

    /// Known languages, replacing the defaults when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<LanguageConfig>>,
}

/// A language ladle knows how to lock and store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageConfig {
    /// Language name used in recipes and by the service (e.g. `C++`).
    pub name: String,
    /// Name safe for lock keys and directories (e.g. `Cpp`).
    pub safe_name: String,
    /// The build extension package for the language.
    pub extension: PackageName,
    /// Extension version that ships with this build of ladle.
    pub version: SemanticVersion,
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (paths::config_dir()?.join("config.toml"), false),
        };

        if !path.exists() {
            if required {
                return Err(Error::configuration(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&path).map_err(|e| Error::io(e, &path, "read config"))?;
        toml::from_str(&content).map_err(|e| {
            Error::configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// The service endpoint, honouring `LADLE_API_ENDPOINT`.
    #[must_use]
    pub fn api_endpoint(&self) -> String {
        if let Ok(endpoint) = std::env::var(API_ENDPOINT_ENV)
            && !endpoint.is_empty()
        {
            return endpoint;
        }
        self.api_endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string())
    }

    /// Root of the package store.
    pub fn package_store(&self) -> Result<PathBuf> {
        match &self.package_store {
            Some(path) => Ok(path.clone()),
            None => Ok(paths::user_data_dir()?.join("packages")),
        }
    }

    /// Root of the lock store.
    pub fn lock_store(&self) -> Result<PathBuf> {
        match &self.lock_store {
            Some(path) => Ok(path.clone()),
            None => Ok(paths::user_data_dir()?.join("locks")),
        }
    }

    /// Implicit language of build dependencies.
    #[must_use]
    pub fn build_language(&self) -> &str {
        self.build_language
            .as_deref()
            .unwrap_or(DEFAULT_BUILD_LANGUAGE)
    }

    /// The known languages and their pinned extensions.
    #[must_use]
    pub fn language_table(&self) -> LanguageTable {
        LanguageTable::new(
            self.build_language().to_string(),
            self.languages.clone().unwrap_or_else(default_languages),
        )
    }
}

fn default_languages() -> Vec<LanguageConfig> {
    let language = |name: &str, safe_name: &str, extension: &str, version| LanguageConfig {
        name: name.to_string(),
        safe_name: safe_name.to_string(),
        extension: PackageName::owned("mwasplund", extension),
        version,
    };
    vec![
        language("C++", "Cpp", "Soup.Cpp", SemanticVersion::new(0, 8, 2)),
        language("C#", "CSharp", "Soup.CSharp", SemanticVersion::new(0, 9, 0)),
        language("Wren", "Wren", "Soup.Wren", SemanticVersion::new(0, 4, 1)),
    ]
}

/// A built-in extension version handed to resolution as a preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferredVersion {
    /// Language of the extension package itself.
    pub language: String,
    /// Extension package name.
    pub name: PackageName,
    /// Pinned version.
    pub version: SemanticVersion,
}

/// Lookup table over the configured languages.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    build_language: String,
    languages: Vec<LanguageConfig>,
}

impl LanguageTable {
    /// Create a table from explicit entries.
    #[must_use]
    pub fn new(build_language: String, languages: Vec<LanguageConfig>) -> Self {
        Self {
            build_language,
            languages,
        }
    }

    /// Implicit language of build dependencies.
    #[must_use]
    pub fn build_language(&self) -> &str {
        &self.build_language
    }

    /// Look up a language by its name.
    pub fn get(&self, name: &str) -> Result<&LanguageConfig> {
        self.languages
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| Error::UnknownLanguage {
                name: name.to_string(),
            })
    }

    /// Safe name for a language name.
    pub fn safe_name(&self, name: &str) -> Result<&str> {
        self.get(name).map(|l| l.safe_name.as_str())
    }

    /// Language name for a safe name.
    pub fn name_from_safe(&self, safe_name: &str) -> Result<&str> {
        self.languages
            .iter()
            .find(|l| l.safe_name == safe_name)
            .map(|l| l.name.as_str())
            .ok_or_else(|| Error::UnknownLanguage {
                name: safe_name.to_string(),
            })
    }

    /// Pinned extension versions, in configuration order.
    #[must_use]
    pub fn preferred_versions(&self) -> Vec<PreferredVersion> {
        self.languages
            .iter()
            .map(|l| PreferredVersion {
                language: self.build_language.clone(),
                name: l.extension.clone(),
                version: l.version,
            })
            .collect()
    }

    /// Whether the package is a built-in extension at exactly its pinned version.
    ///
    /// Extensions are build-language packages, so a package of any other
    /// language never matches even if its name and version do.
    #[must_use]
    pub fn is_pinned_extension(
        &self,
        language_safe_name: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> bool {
        self.safe_name(&self.build_language)
            .is_ok_and(|build| build == language_safe_name)
            && self
                .languages
                .iter()
                .any(|l| &l.extension == name && &l.version == version)
    }
}
