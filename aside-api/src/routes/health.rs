//! Health endpoints for orchestrator probes.
//!
//! `/health/ping` and `/health/live` only prove the process answers.
//! `/health/ready` additionally probes the backing store with a lookup; a
//! store that answers, with a value or with "not found", is ready.

use std::time::Instant;

use aside_core::{CacheKey, StoreError};
use aside_storage::{CacheStore, StoreKind};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::state::AppState;

/// Key probed by the readiness check. Absent in normal operation.
const READINESS_PROBE_URL: &str = "aside://health/readiness-probe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Present on readiness reports only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreProbe>,
}

/// Outcome of probing the backing store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreProbe {
    pub kind: StoreKind,
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreProbe {
    async fn run(store: &dyn CacheStore) -> Self {
        let start = Instant::now();
        let outcome = store.get(&CacheKey::fetch(READINESS_PROBE_URL)).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(_) | Err(StoreError::NotFound) => None,
            Err(e) => Some(e.to_string()),
        };

        Self {
            kind: store.kind(),
            reachable: error.is_none(),
            latency_ms,
            error,
        }
    }
}

fn report(state: &AppState, store: Option<StoreProbe>) -> HealthReport {
    let healthy = store.as_ref().map_or(true, |probe| probe.reachable);
    HealthReport {
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store,
    }
}

/// GET /health/ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /health/live
pub async fn liveness(State(state): State<AppState>) -> Json<HealthReport> {
    Json(report(&state, None))
}

/// GET /health/ready - 503 while the store is unreachable
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let probe = StoreProbe::run(&**state.resolver.store()).await;
    if let Some(error) = &probe.error {
        tracing::warn!(error = %error, "Readiness probe failed");
    }

    let body = report(&state, Some(probe));
    let status = match body.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(body))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}
