//! Single-shot HTTP fetch producer

use std::time::Duration;

use async_trait::async_trait;
use aside_core::{CacheKey, Producer, UpstreamError};
use reqwest::Client;

use crate::status_line;

/// Fetches the URL held in a fetch key and returns the response body.
///
/// Any non-2xx status becomes an [`UpstreamError`] carrying the status code
/// and its status line. No retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Use an existing client (shared connection pool).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Producer for HttpFetcher {
    async fn produce(&self, key: &CacheKey) -> Result<Vec<u8>, UpstreamError> {
        let url = key.as_str_lossy();

        let response = self
            .client
            .get(url.as_ref())
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "fetch returned non-success status");
            return Err(UpstreamError::status(status.as_u16(), status_line(status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::transport(format!("Failed to read response body: {}", e)))?;

        Ok(body.to_vec())
    }
}
