//! Wire models of the closure generation endpoint.

use ladle_core::package::{DependencyCategory, PackageId, SemanticVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Semantic version as sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticVersionModel {
    /// Major version.
    pub major: u32,
    /// Minor version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<u32>,
    /// Patch version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<u32>,
}

impl From<SemanticVersion> for SemanticVersionModel {
    fn from(version: SemanticVersion) -> Self {
        Self {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
        }
    }
}

impl From<SemanticVersionModel> for SemanticVersion {
    fn from(model: SemanticVersionModel) -> Self {
        Self {
            major: model.major,
            minor: model.minor,
            patch: model.patch,
        }
    }
}

/// Language of a local package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageReferenceModel {
    /// Language name.
    pub name: String,
    /// Requested extension version.
    pub version: SemanticVersionModel,
}

/// A local package and the ids of its dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPackageModel {
    /// Discovery id.
    pub id: PackageId,
    /// Declared name.
    pub name: String,
    /// Recipe language.
    pub language: LanguageReferenceModel,
    /// Dependency ids per category.
    pub dependencies: BTreeMap<DependencyCategory, Vec<PackageId>>,
}

/// A public package requested by some local package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPackageModel {
    /// Discovery id.
    pub id: PackageId,
    /// Package language.
    pub language: String,
    /// Owner, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Package name.
    pub name: String,
    /// Requested version.
    pub version: SemanticVersionModel,
}

/// A fully identified public package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePublicReferenceModel {
    /// Package language.
    pub language: String,
    /// Owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Package name.
    pub name: String,
    /// Version, required for resolved entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SemanticVersionModel>,
}

/// Request body of `POST /v1/closure/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateClosureRequestModel {
    /// The root package.
    pub root_package: LocalPackageModel,
    /// Every other local package.
    pub local_packages: Vec<LocalPackageModel>,
    /// Every public package.
    pub public_packages: Vec<PublicPackageModel>,
    /// Versions to prefer when the request allows a choice.
    pub preferred_versions: Vec<PackagePublicReferenceModel>,
}

/// Outcome reported by the resolution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerateClosureResult {
    /// A closure was generated.
    Success,
    /// No compatible closure exists.
    Failure,
}

/// One entry of a resolved closure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageClosureEntryModel {
    /// Resolved public package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_package: Option<PackagePublicReferenceModel>,
    /// Id of a local package from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_package_id: Option<PackageId>,
    /// Build closure applying to this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_closure: Option<String>,
    /// Tool closure applying to this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_closure: Option<String>,
}

/// Response body of `POST /v1/closure/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateClosureResultModel {
    /// Outcome.
    pub result: GenerateClosureResult,
    /// Message explaining a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Runtime closure of the root package.
    #[serde(default)]
    pub runtime_closure: Vec<PackageClosureEntryModel>,
    /// Named build closures.
    #[serde(default)]
    pub build_closures: BTreeMap<String, Vec<PackageClosureEntryModel>>,
    /// Named tool closures.
    #[serde(default)]
    pub tool_closures: BTreeMap<String, Vec<PackageClosureEntryModel>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_is_camel_case() {
        let mut dependencies = BTreeMap::new();
        dependencies.insert(DependencyCategory::Runtime, vec![2]);
        let request = GenerateClosureRequestModel {
            root_package: LocalPackageModel {
                id: 1,
                name: "App".into(),
                language: LanguageReferenceModel {
                    name: "C++".into(),
                    version: SemanticVersion::major_only(0).into(),
                },
                dependencies,
            },
            local_packages: Vec::new(),
            public_packages: vec![PublicPackageModel {
                id: 2,
                language: "C++".into(),
                owner: Some("mwasplund".into()),
                name: "json11".into(),
                version: SemanticVersion::new(1, 1, 0).into(),
            }],
            preferred_versions: Vec::new(),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "rootPackage": {
                    "id": 1,
                    "name": "App",
                    "language": { "name": "C++", "version": { "major": 0 } },
                    "dependencies": { "Runtime": [2] }
                },
                "localPackages": [],
                "publicPackages": [{
                    "id": 2,
                    "language": "C++",
                    "owner": "mwasplund",
                    "name": "json11",
                    "version": { "major": 1, "minor": 1, "patch": 0 }
                }],
                "preferredVersions": []
            })
        );
    }

    #[test]
    fn test_failure_response_without_closures() {
        let response: GenerateClosureResultModel = serde_json::from_value(json!({
            "result": "Failure",
            "message": "version conflict"
        }))
        .unwrap();
        assert_eq!(response.result, GenerateClosureResult::Failure);
        assert_eq!(response.message.as_deref(), Some("version conflict"));
        assert!(response.runtime_closure.is_empty());
    }
}
