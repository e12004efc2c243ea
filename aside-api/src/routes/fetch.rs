//! Fetch Route
//!
//! `POST /fetch` resolves a URL to its response body through the cache.

use aside_core::CacheKey;
use axum::{body::Bytes, extract::State, response::Response};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::{observe_resolution, resolution_response};

/// Request body for `POST /fetch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
}

/// POST /fetch - Return the body at `url`, from cache when present.
///
/// The body is decoded by hand so malformed JSON is a 400 rather than
/// axum's 422 rejection.
pub async fn fetch(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: FetchRequest = serde_json::from_slice(&body)?;
    if request.url.trim().is_empty() {
        return Err(ApiError::missing_field("url"));
    }

    let key = CacheKey::fetch(request.url);
    let resolution = observe_resolution(&key, state.resolver.fetch(&key, &*state.fetcher)).await?;

    Ok(resolution_response(resolution, "application/octet-stream"))
}
