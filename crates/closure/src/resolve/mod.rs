//! Closure resolution client.
//!
//! Turns a [`DiscoveredGraph`] into a resolution request, hands it to a
//! [`ClosureResolver`] and decodes the answer back into named package
//! identities. Version selection happens entirely on the service.

mod http;
pub mod models;

pub use http::HttpClosureResolver;

use async_trait::async_trait;
use ladle_core::config::PreferredVersion;
use ladle_core::package::{PackageId, PackageName, SemanticVersion};
use ladle_core::{Error, Result};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::discovery::{DiscoveredGraph, LocalPackageRecord};
use models::{
    GenerateClosureRequestModel, GenerateClosureResult, GenerateClosureResultModel,
    LanguageReferenceModel, LocalPackageModel, PackageClosureEntryModel,
    PackagePublicReferenceModel, PublicPackageModel,
};

/// The remote authority that selects versions.
#[async_trait]
pub trait ClosureResolver: Send + Sync {
    /// Send one closure generation request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceUnavailable`] when the service cannot be
    /// reached or does not answer with a closure result.
    async fn generate_closure(
        &self,
        request: &GenerateClosureRequestModel,
    ) -> Result<GenerateClosureResultModel>;
}

/// What a resolved entry points at.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolvedReference {
    /// A published version.
    Version(SemanticVersion),
    /// A package directory in the workspace.
    Local(PathBuf),
}

/// One package of a resolved closure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedEntry {
    /// Resolved reference.
    pub reference: ResolvedReference,
    /// Build closure name, only set for runtime closure entries.
    pub build_closure: Option<String>,
    /// Tool closure name, only set for runtime closure entries.
    pub tool_closure: Option<String>,
}

/// Language name to package name to resolved entry.
pub type ResolvedClosure = BTreeMap<String, BTreeMap<PackageName, ResolvedEntry>>;

/// Everything the service resolved for one root package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedClosures {
    /// The runtime closure.
    pub runtime: ResolvedClosure,
    /// Build closures by name.
    pub build: BTreeMap<String, ResolvedClosure>,
    /// Tool closures by name.
    pub tool: BTreeMap<String, ResolvedClosure>,
}

/// Resolves discovered graphs through a [`ClosureResolver`].
pub struct ResolutionClient {
    resolver: Arc<dyn ClosureResolver>,
}

impl ResolutionClient {
    /// Create a resolution client.
    #[must_use]
    pub fn new(resolver: Arc<dyn ClosureResolver>) -> Self {
        Self { resolver }
    }

    /// Resolve a discovered graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolutionRejected`] when the service reports a
    /// failure and an internal error when the response references packages
    /// the request never contained.
    pub async fn resolve(
        &self,
        graph: &DiscoveredGraph,
        preferred_versions: &[PreferredVersion],
    ) -> Result<ResolvedClosures> {
        let request = build_request(graph, preferred_versions)?;
        info!(
            locals = graph.locals.len(),
            publics = graph.publics.len(),
            "Requesting closure resolution"
        );

        let response = self.resolver.generate_closure(&request).await?;
        if response.result != GenerateClosureResult::Success {
            return Err(Error::ResolutionRejected {
                message: response
                    .message
                    .unwrap_or_else(|| "no message provided".to_string()),
            });
        }

        let decoder = Decoder { graph };
        let runtime = decoder.closure(&response.runtime_closure, true)?;
        let build = decoder.named_closures(&response.build_closures)?;
        let tool = decoder.named_closures(&response.tool_closures)?;
        debug!(
            build_closures = build.len(),
            tool_closures = tool.len(),
            "Closure resolved"
        );

        Ok(ResolvedClosures {
            runtime,
            build,
            tool,
        })
    }
}

fn local_model(record: &LocalPackageRecord) -> LocalPackageModel {
    LocalPackageModel {
        id: record.id,
        name: record.name.clone(),
        language: LanguageReferenceModel {
            name: record.language.name.clone(),
            version: record.language.version.into(),
        },
        dependencies: record.dependencies.clone(),
    }
}

fn build_request(
    graph: &DiscoveredGraph,
    preferred_versions: &[PreferredVersion],
) -> Result<GenerateClosureRequestModel> {
    let root = graph.root()?;
    Ok(GenerateClosureRequestModel {
        root_package: local_model(root),
        local_packages: graph
            .locals
            .iter()
            .filter(|l| l.id != graph.root_id)
            .map(local_model)
            .collect(),
        public_packages: graph
            .publics
            .iter()
            .map(|p| PublicPackageModel {
                id: p.id,
                language: p.language.clone(),
                owner: p.owner.clone(),
                name: p.name.clone(),
                version: p.version.into(),
            })
            .collect(),
        preferred_versions: preferred_versions
            .iter()
            .map(|p| PackagePublicReferenceModel {
                language: p.language.clone(),
                owner: p.name.owner.clone(),
                name: p.name.name.clone(),
                version: Some(p.version.into()),
            })
            .collect(),
    })
}

/// Maps response entries back onto the discovered graph.
struct Decoder<'a> {
    graph: &'a DiscoveredGraph,
}

impl Decoder<'_> {
    fn named_closures(
        &self,
        closures: &BTreeMap<String, Vec<PackageClosureEntryModel>>,
    ) -> Result<BTreeMap<String, ResolvedClosure>> {
        closures
            .iter()
            .map(|(name, entries)| Ok((name.clone(), self.closure(entries, false)?)))
            .collect()
    }

    fn closure(
        &self,
        entries: &[PackageClosureEntryModel],
        is_runtime: bool,
    ) -> Result<ResolvedClosure> {
        let mut closure = ResolvedClosure::new();
        for model in entries {
            let (language, name, reference) = self.identify(model)?;
            let entry = ResolvedEntry {
                reference,
                build_closure: model.build_closure.clone().filter(|_| is_runtime),
                tool_closure: model.tool_closure.clone().filter(|_| is_runtime),
            };

            match closure.entry(language).or_default().entry(name) {
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
                Entry::Occupied(existing) => {
                    warn!(
                        name = %existing.key(),
                        "Duplicate package in resolved closure, keeping the first entry"
                    );
                }
            }
        }
        Ok(closure)
    }

    fn identify(
        &self,
        model: &PackageClosureEntryModel,
    ) -> Result<(String, PackageName, ResolvedReference)> {
        match (&model.public_package, model.local_package_id) {
            (Some(public), None) => {
                let version = public.version.ok_or_else(|| {
                    Error::internal(format!(
                        "Resolved public package '{}' has no version",
                        public.name
                    ))
                })?;
                Ok((
                    public.language.clone(),
                    PackageName::new(public.owner.clone(), public.name.clone()),
                    ResolvedReference::Version(SemanticVersion::from(version).fill_defaults()),
                ))
            }
            (None, Some(id)) => {
                let local = self.local(id)?;
                Ok((
                    local.language.name.clone(),
                    PackageName::local(local.name.clone()),
                    ResolvedReference::Local(local.path.clone()),
                ))
            }
            (Some(_), Some(id)) => Err(Error::internal(format!(
                "Resolved entry for local package {} also carries a public package",
                id
            ))),
            (None, None) => Err(Error::internal(
                "Resolved entry has neither a public package nor a local package id",
            )),
        }
    }

    fn local(&self, id: PackageId) -> Result<&LocalPackageRecord> {
        self.graph.local(id).ok_or_else(|| {
            Error::internal(format!("Resolved closure references unknown local package {}", id))
        })
    }
}
