//! Cache Administration Routes
//!
//! - `DELETE /cache/:namespace` removes one entry
//! - `GET /cache/stats` reports store and resolver counters

use aside_core::{normalize, KeyNamespace};
use aside_storage::{ResolverStats, StoreKind, StoreStats};
use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// ============================================================================
// TYPES
// ============================================================================

/// Request body for `DELETE /cache/:namespace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub store: StoreReport,
    pub resolver: ResolverStats,
    pub in_flight: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreReport {
    pub kind: StoreKind,
    #[serde(flatten)]
    pub stats: StoreStats,
    pub hit_rate: f64,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// DELETE /cache/:namespace - Remove one entry
///
/// Deleting an absent key is not an error; the response reports whether
/// anything was removed. Store failures are reported as 500.
pub async fn invalidate(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    body: Bytes,
) -> ApiResult<Json<InvalidateResponse>> {
    let namespace = KeyNamespace::parse(&namespace)
        .ok_or_else(|| ApiError::invalid_format("namespace", "fetch or search"))?;
    let request: InvalidateRequest = serde_json::from_slice(&body)?;

    let key = normalize(namespace, &request.key);
    let deleted = state
        .resolver
        .store()
        .delete(&key)
        .await
        .map_err(|e| ApiError::store_error(e.to_string()))?;

    tracing::info!(key = %key, deleted, "Cache entry invalidated");
    Ok(Json(InvalidateResponse { deleted }))
}

/// GET /cache/stats - Store and resolver counters
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<CacheStatsResponse>> {
    let store = state.resolver.store();
    let stats = store.stats().await?;

    Ok(Json(CacheStatsResponse {
        store: StoreReport {
            kind: store.kind(),
            hit_rate: stats.hit_rate(),
            stats,
        },
        resolver: state.resolver.stats(),
        in_flight: state.resolver.in_flight(),
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/:namespace", delete(invalidate))
}
