//! Client for the JSON document store that receives crawled pages.

use reqwest::Client;
use tracing::{debug, instrument};

use polycrawl_shared::{PageDocument, PolycrawlError, Result};

/// Posts [`PageDocument`]s to a Solr-style `update/json/docs` endpoint.
#[derive(Debug, Clone)]
pub struct IndexClient {
    client: Client,
    endpoint: String,
}

impl IndexClient {
    /// Create a client posting to `endpoint` through an existing HTTP client.
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// POST one document. Returns the response status on success.
    ///
    /// A single attempt is made; non-success statuses are errors.
    #[instrument(skip_all, fields(url = %doc.url, endpoint = %self.endpoint))]
    pub async fn post(&self, doc: &PageDocument) -> Result<u16> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(doc)
            .send()
            .await
            .map_err(|e| PolycrawlError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body.trim(), "index response");

        if !status.is_success() {
            return Err(PolycrawlError::Network(format!(
                "{}: HTTP {status}: {}",
                self.endpoint,
                body.trim()
            )));
        }
        Ok(status.as_u16())
    }
}
