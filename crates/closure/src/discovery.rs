//! Local graph discovery.
//!
//! Walks recipes depth first starting at a root directory. Every recipe
//! directory becomes one [`LocalPackageRecord`], every distinct public
//! reference one [`PublicPackageRecord`]. Ids come from one counter shared
//! by both kinds, in first-discovery order.

use async_recursion::async_recursion;
use ladle_core::manifest::{ManifestReader, Recipe};
use ladle_core::package::{
    DependencyCategory, LanguageReference, PackageId, PackageReference, SemanticVersion,
};
use ladle_core::{Error, RECIPE_FILE_NAME, Result, paths};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// A package whose recipe lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPackageRecord {
    /// Discovery id.
    pub id: PackageId,
    /// Recipe language and extension version.
    pub language: LanguageReference,
    /// Name declared by the recipe.
    pub name: String,
    /// Normalized package directory.
    pub path: PathBuf,
    /// Dependency ids per category, in declaration order.
    pub dependencies: BTreeMap<DependencyCategory, Vec<PackageId>>,
}

/// A public package referenced by at least one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPackageRecord {
    /// Discovery id.
    pub id: PackageId,
    /// Package language.
    pub language: String,
    /// Owner, if the reference declared one.
    pub owner: Option<String>,
    /// Package name.
    pub name: String,
    /// Requested version, zero filled.
    pub version: SemanticVersion,
}

/// Result of one discovery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredGraph {
    /// Id of the root package.
    pub root_id: PackageId,
    /// Local packages in registration order (dependencies before dependents).
    pub locals: Vec<LocalPackageRecord>,
    /// Public packages in first-discovery order.
    pub publics: Vec<PublicPackageRecord>,
}

impl DiscoveredGraph {
    /// Look up a local record by id.
    #[must_use]
    pub fn local(&self, id: PackageId) -> Option<&LocalPackageRecord> {
        self.locals.iter().find(|l| l.id == id)
    }

    /// The root package record.
    pub fn root(&self) -> Result<&LocalPackageRecord> {
        self.local(self.root_id).ok_or_else(|| {
            Error::internal(format!("Root package {} was never registered", self.root_id))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PublicKey {
    owner: Option<String>,
    name: String,
    language: String,
    version: SemanticVersion,
}

/// Mutable state of a single discovery run.
#[derive(Debug, Default)]
struct DiscoveryState {
    next_id: PackageId,
    // Assigned when a directory is first visited, before its record exists
    local_ids: HashMap<PathBuf, PackageId>,
    locals: Vec<LocalPackageRecord>,
    public_ids: HashMap<PublicKey, PackageId>,
    publics: Vec<PublicPackageRecord>,
}

impl DiscoveryState {
    fn allocate_id(&mut self) -> PackageId {
        self.next_id += 1;
        self.next_id
    }
}

/// Builds a [`DiscoveredGraph`] from recipes on disk.
pub struct Discoverer {
    reader: Arc<dyn ManifestReader>,
    build_language: String,
}

impl Discoverer {
    /// Create a discoverer.
    ///
    /// `build_language` is the implicit language of build dependencies.
    #[must_use]
    pub fn new(reader: Arc<dyn ManifestReader>, build_language: impl Into<String>) -> Self {
        Self {
            reader,
            build_language: build_language.into(),
        }
    }

    /// Discover the package graph rooted at `root_directory`.
    ///
    /// # Errors
    ///
    /// Fails on the first recipe that is missing or invalid, and on any
    /// public reference without a version or a tool reference without a
    /// language and owner.
    pub async fn discover(&self, root_directory: &Path) -> Result<DiscoveredGraph> {
        let mut state = DiscoveryState::default();
        let root_id = self
            .visit(paths::normalize(root_directory), &mut state)
            .await?;
        debug!(
            locals = state.locals.len(),
            publics = state.publics.len(),
            "Discovered package graph"
        );
        Ok(DiscoveredGraph {
            root_id,
            locals: state.locals,
            publics: state.publics,
        })
    }

    #[async_recursion]
    async fn visit(&self, directory: PathBuf, state: &mut DiscoveryState) -> Result<PackageId> {
        if let Some(id) = state.local_ids.get(&directory) {
            trace!(?directory, id, "Recipe already discovered");
            return Ok(*id);
        }

        let recipe = self.reader.load(&directory.join(RECIPE_FILE_NAME)).await?;
        let id = state.allocate_id();
        state.local_ids.insert(directory.clone(), id);
        debug!(name = %recipe.name, id, ?directory, "Discovering recipe");

        let mut dependencies = BTreeMap::new();
        for (category, references) in &recipe.dependencies {
            let mut ids = Vec::with_capacity(references.len());
            for reference in references {
                let dependency_id = match reference {
                    PackageReference::Local { .. } => {
                        let path = reference.resolve_path(&directory).ok_or_else(|| {
                            Error::internal(format!("Local reference '{}' has no path", reference))
                        })?;
                        self.visit(paths::normalize(&path), state).await?
                    }
                    PackageReference::Public { .. } => {
                        let key = self.public_key(&recipe, &directory, category, reference)?;
                        register_public(state, key)
                    }
                };
                ids.push(dependency_id);
            }
            dependencies.insert(category.clone(), ids);
        }

        state.locals.push(LocalPackageRecord {
            id,
            language: recipe.language,
            name: recipe.name,
            path: directory,
            dependencies,
        });
        Ok(id)
    }

    fn public_key(
        &self,
        recipe: &Recipe,
        directory: &Path,
        category: &DependencyCategory,
        reference: &PackageReference,
    ) -> Result<PublicKey> {
        let PackageReference::Public {
            language,
            owner,
            name,
            version,
        } = reference
        else {
            return Err(Error::internal(format!(
                "Reference '{}' is not public",
                reference
            )));
        };

        let version = version.ok_or_else(|| {
            Error::invalid_reference(reference.to_string(), "public references require a version")
        })?;

        let language = match (category, language) {
            (DependencyCategory::Tool, Some(language)) if owner.is_some() => language.clone(),
            (DependencyCategory::Tool, _) => {
                return Err(Error::IncompleteToolReference {
                    reference: reference.to_string(),
                    recipe: directory.join(RECIPE_FILE_NAME),
                });
            }
            (_, Some(language)) => language.clone(),
            (DependencyCategory::Build, None) => self.build_language.clone(),
            (_, None) => recipe.language.name.clone(),
        };

        Ok(PublicKey {
            owner: owner.clone(),
            name: name.clone(),
            language,
            version: version.fill_defaults(),
        })
    }
}

fn register_public(state: &mut DiscoveryState, key: PublicKey) -> PackageId {
    if let Some(id) = state.public_ids.get(&key) {
        return *id;
    }

    let id = state.allocate_id();
    state.publics.push(PublicPackageRecord {
        id,
        language: key.language.clone(),
        owner: key.owner.clone(),
        name: key.name.clone(),
        version: key.version,
    });
    state.public_ids.insert(key, id);
    id
}
