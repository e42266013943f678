//! Recipe (package manifest) model and the reader collaborator.
//!
//! Every package directory contains a `Recipe.toml`:
//!
//! ```toml
//! Name = "App"
//! Language = "C++|0.8.2"
//! Version = "1.0.0"
//!
//! [Dependencies]
//! Runtime = ["../Lib", "mwasplund|json11@1.1"]
//! Build = ["mwasplund|Soup.Test.Cpp@0.4"]
//! Tool = ["[C++]mwasplund|copy@1.0.0"]
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::package::{DependencyCategory, LanguageReference, PackageReference, SemanticVersion};
use crate::{Error, Result};

/// A parsed recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    /// Declared package name.
    pub name: String,
    /// Language and extension version.
    pub language: LanguageReference,
    /// Declared package version, if any.
    pub version: Option<SemanticVersion>,
    /// Declared dependencies per category, in declaration order.
    pub dependencies: BTreeMap<DependencyCategory, Vec<PackageReference>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecipeFile {
    name: String,
    language: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, Vec<String>>,
}

impl Recipe {
    /// Parse recipe text. `path` is only used for error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let file: RecipeFile =
            toml::from_str(content).map_err(|e| Error::invalid_recipe(path, e.to_string()))?;

        let language = file
            .language
            .parse()
            .map_err(|e: Error| Error::invalid_recipe(path, e.to_string()))?;
        let version = file
            .version
            .map(|v| v.parse())
            .transpose()
            .map_err(|e: Error| Error::invalid_recipe(path, e.to_string()))?;

        let mut dependencies = BTreeMap::new();
        for (category, references) in file.dependencies {
            let references = references
                .iter()
                .map(|r| r.parse())
                .collect::<Result<Vec<PackageReference>>>()?;
            dependencies.insert(DependencyCategory::from(category), references);
        }

        Ok(Self {
            name: file.name,
            language,
            version,
            dependencies,
        })
    }
}

/// Loads recipes from disk.
///
/// Discovery only talks to this trait, so tests can serve recipes from memory.
#[async_trait]
pub trait ManifestReader: Send + Sync {
    /// Load the recipe at `recipe_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecipeNotFound`] when the file does not exist and
    /// [`Error::InvalidRecipe`] when it cannot be parsed.
    async fn load(&self, recipe_path: &Path) -> Result<Recipe>;
}

/// Reads `Recipe.toml` files from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlRecipeReader;

#[async_trait]
impl ManifestReader for TomlRecipeReader {
    async fn load(&self, recipe_path: &Path) -> Result<Recipe> {
        let content = match tokio::fs::read_to_string(recipe_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::RecipeNotFound {
                    path: recipe_path.to_path_buf(),
                });
            }
            Err(e) => return Err(Error::io(e, recipe_path, "read recipe")),
        };
        Recipe::parse(&content, recipe_path)
    }
}
