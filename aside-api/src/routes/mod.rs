//! REST API Routes Module
//!
//! Includes:
//! - `POST /fetch` and `POST /search` cache-aside resolution
//! - Cache invalidation and statistics under `/cache`
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus scraping at `/metrics`

pub mod cache;
pub mod fetch;
pub mod health;
pub mod search;

use std::future::Future;
use std::time::Instant;

use aside_core::{AsideResult, CacheKey};
use aside_storage::Resolution;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware, METRICS};

pub use cache::create_router as cache_router;
pub use health::create_router as health_router;

/// Response header reporting whether the body came from the cache.
pub const X_CACHE: &str = "x-cache";

/// Build the full service router.
pub fn create_api_router(state: AppState, config: &ApiConfig) -> Router {
    Router::new()
        .route("/fetch", post(fetch::fetch))
        .route("/search", post(search::search))
        .nest("/cache", cache::create_router())
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn(observability_middleware))
                .layer(DefaultBodyLimit::max(config.max_body_bytes)),
        )
        .with_state(state)
}

/// Await a resolution, recording its outcome and latency.
pub(crate) async fn observe_resolution<F>(key: &CacheKey, resolution: F) -> ApiResult<Resolution>
where
    F: Future<Output = AsideResult<Resolution>>,
{
    let start = Instant::now();
    let result = resolution.await;

    let outcome = match &result {
        Ok(resolution) => resolution.source().cache_label(),
        Err(_) => "error",
    };
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_resolution(
            key.namespace().as_str(),
            outcome,
            start.elapsed().as_secs_f64(),
        );
    }

    Ok(result?)
}

/// 200 with the resolved bytes as the body.
pub(crate) fn resolution_response(resolution: Resolution, content_type: &'static str) -> Response {
    let cache_status = resolution.source().cache_label();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (
                HeaderName::from_static(X_CACHE),
                HeaderValue::from_static(cache_status),
            ),
        ],
        resolution.into_value(),
    )
        .into_response()
}
