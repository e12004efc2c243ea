//! Search Route
//!
//! `POST /search` resolves a keyword search to the JSON array of every
//! result page, through the cache.

use aside_core::{CacheKey, SearchParams};
use axum::{body::Bytes, extract::State, response::Response};
use serde::{Deserialize, Serialize};

use crate::{error::ApiResult, state::AppState};

use super::{observe_resolution, resolution_response};

/// Request body for `POST /search`.
///
/// Missing, zero or negative limits fall back to 5 items per page and a
/// single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub keywords: String,
    #[serde(default)]
    pub max_per_page: i64,
    #[serde(default)]
    pub max_pages: i64,
}

impl SearchRequest {
    pub fn params(&self) -> SearchParams {
        SearchParams::new(self.max_per_page, self.max_pages)
    }
}

/// POST /search - Search results for `keywords`, from cache when present.
///
/// Keywords are the cache key verbatim. Limits only shape the request to the
/// producer on a miss; they are not part of the key.
pub async fn search(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: SearchRequest = serde_json::from_slice(&body)?;
    let params = request.params();

    let key = CacheKey::search(request.keywords);
    let resolution = observe_resolution(
        &key,
        state.resolver.search(&key, params, &*state.searcher),
    )
    .await?;

    Ok(resolution_response(resolution, "application/json"))
}
