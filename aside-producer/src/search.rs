//! Paginated keyword search producer.
//!
//! Speaks a JSON search API of the shape
//!
//! ```text
//! GET {endpoint}?part=snippet&q=<keywords>&maxResults=<n>&pageToken=<token>&key=<api key>
//!
//! { "nextPageToken": "CAUQAA", "items": [ ... ] }
//! ```
//!
//! The first page is requested before [`PagedProducer::search`] returns, so
//! a bad request or an unreachable endpoint fails the call itself. Every
//! following page is requested only when the stream is polled, and only
//! while the previous page carried a `nextPageToken` and fewer than
//! `max_pages` pages have been yielded.

use std::time::Duration;

use async_trait::async_trait;
use aside_core::{CacheKey, PageLimits, PageStream, PagedProducer, SearchPage, UpstreamError};
use reqwest::Client;
use serde::Deserialize;

use crate::status_line;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// HTTP client for a paginated search API.
#[derive(Clone)]
pub struct HttpSearchClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSearchClient {
    /// Create a search client.
    ///
    /// # Arguments
    /// * `endpoint` - Search URL, without query string
    /// * `api_key` - Sent as the `key` query parameter when present
    /// * `timeout` - Per-page request timeout
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, endpoint, api_key))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSearchClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Everything needed to request one page; owned so the page stream can
/// outlive the call that created it.
#[derive(Clone)]
struct PageRequest {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    query: String,
    per_page: u64,
}

impl PageRequest {
    async fn fetch(&self, page_token: Option<&str>) -> Result<SearchPage, UpstreamError> {
        let mut params: Vec<(&str, String)> = vec![
            ("part", "snippet".to_string()),
            ("q", self.query.clone()),
            ("maxResults", self.per_page.to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::status(status.as_u16(), status_line(status)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::transport(format!("Failed to parse search response: {}", e)))?;

        Ok(SearchPage {
            page_token: page_token.map(str::to_string),
            next_page_token: body.next_page_token.filter(|token| !token.is_empty()),
            items: body.items,
        })
    }
}

#[async_trait]
impl PagedProducer for HttpSearchClient {
    async fn search(&self, key: &CacheKey, limits: PageLimits) -> Result<PageStream, UpstreamError> {
        let request = PageRequest {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            query: key.as_str_lossy().into_owned(),
            per_page: limits.max_per_page,
        };

        let first = request.fetch(None).await?;
        let max_pages = limits.max_pages;

        let pages = async_stream::stream! {
            let mut next_token = first.next_page_token.clone();
            let mut yielded: u64 = 1;
            yield Ok(first);

            while let Some(token) = next_token.take() {
                if yielded >= max_pages {
                    break;
                }
                match request.fetch(Some(&token)).await {
                    Ok(page) => {
                        next_token = page.next_page_token.clone();
                        yielded += 1;
                        yield Ok(page);
                    }
                    Err(e) => {
                        tracing::warn!(page = yielded + 1, error = %e, "search page request failed");
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(pages))
    }
}
