use async_trait::async_trait;
use ladle_core::{Error, Result};
use reqwest::{Client, Url};
use tracing::debug;

use super::ClosureResolver;
use super::models::{GenerateClosureRequestModel, GenerateClosureResultModel};

/// Resolution service reached over HTTP at `{endpoint}/v1/closure/generate`.
pub struct HttpClosureResolver {
    client: Client,
    url: Url,
}

impl HttpClosureResolver {
    /// Create a resolver for the given service endpoint.
    pub fn new(client: Client, endpoint: &str) -> Result<Self> {
        let mut url = Url::parse(endpoint).map_err(|e| {
            Error::configuration(format!("Invalid api endpoint '{}': {}", endpoint, e))
        })?;
        url.path_segments_mut()
            .map_err(|()| Error::configuration("Api endpoint cannot be a base url"))?
            .pop_if_empty()
            .extend(["v1", "closure", "generate"]);
        Ok(Self { client, url })
    }
}

#[async_trait]
impl ClosureResolver for HttpClosureResolver {
    async fn generate_closure(
        &self,
        request: &GenerateClosureRequestModel,
    ) -> Result<GenerateClosureResultModel> {
        debug!(url = %self.url, "Sending closure request");
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::service_unavailable(format!("Closure request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::service_unavailable(format!(
                "Closure request failed (HTTP {}): {}",
                status, body
            )));
        }

        response
            .json::<GenerateClosureResultModel>()
            .await
            .map_err(|e| Error::internal(format!("Unexpected closure response: {}", e)))
    }
}
