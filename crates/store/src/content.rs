//! Package content service client.
//!
//! Downloads the archive for one published package version. A 404 is the
//! only status with a meaning of its own: the version no longer exists.

use async_trait::async_trait;
use ladle_core::package::{PackageName, SemanticVersion};
use ladle_core::{Error, Result};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

/// Source of package archives.
#[async_trait]
pub trait PackageContentService: Send + Sync {
    /// Download the archive of a package version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PackageVersionMissing`] when the service does not know
    /// the version and [`Error::ServiceUnavailable`] for any other failure.
    async fn download(
        &self,
        language: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> Result<Vec<u8>>;
}

/// HTTP client for `{endpoint}/v1/languages/{language}/packages/{owner}/{name}/versions/{version}/download`.
pub struct HttpContentService {
    client: Client,
    endpoint: Url,
}

impl HttpContentService {
    /// Create a client for the given service endpoint.
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            Error::configuration(format!("Invalid api endpoint '{}': {}", endpoint, e))
        })?;
        Ok(Self { client, endpoint })
    }

    fn download_url(
        &self,
        language: &str,
        owner: &str,
        name: &str,
        version: &SemanticVersion,
    ) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| Error::configuration("Api endpoint cannot be a base url"))?
            .pop_if_empty()
            .extend([
                "v1",
                "languages",
                language,
                "packages",
                owner,
                name,
                "versions",
                &version.to_string(),
                "download",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl PackageContentService for HttpContentService {
    async fn download(
        &self,
        language: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> Result<Vec<u8>> {
        let owner = name.owner.as_deref().ok_or_else(|| {
            Error::internal(format!("Public package '{}' has no owner", name))
        })?;
        let url = self.download_url(language, owner, &name.name, version)?;
        debug!(%url, "Downloading package archive");

        let response = self.client.get(url).send().await.map_err(|e| {
            Error::service_unavailable(format!("Failed to download {}@{}: {}", name, version, e))
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::PackageVersionMissing {
                language: language.to_string(),
                name: name.to_string(),
                version: version.to_string(),
            }),
            status if !status.is_success() => Err(Error::service_unavailable(format!(
                "Failed to download {}@{} (HTTP {})",
                name, version, status
            ))),
            _ => response.bytes().await.map(|b| b.to_vec()).map_err(|e| {
                Error::service_unavailable(format!("Failed to read {}@{}: {}", name, version, e))
            }),
        }
    }
}
