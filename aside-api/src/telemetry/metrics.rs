//! Prometheus Metrics Definitions
//!
//! Defines the aside metrics with their labels and types, and the
//! `/metrics` endpoint for Prometheus scraping.

use aside_storage::ResolverStats;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, register_int_counter,
    CounterVec, Encoder, Gauge, HistogramVec, IntCounter, TextEncoder,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Resolution latency buckets (seconds). Misses include upstream round
/// trips and full page drains, so the tail runs longer than HTTP's.
const RESOLUTION_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0, 15.0, 30.0, 60.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<AsideMetrics>> = Lazy::new(AsideMetrics::new);

/// Container for all aside metrics.
#[derive(Clone)]
pub struct AsideMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Resolution counter - labels: namespace, outcome (hit/miss/error)
    pub resolutions_total: CounterVec,

    /// Resolution duration histogram - labels: namespace, outcome
    pub resolution_duration_seconds: HistogramVec,

    /// Cache writes that failed and were swallowed or surfaced
    pub cache_write_failures_total: IntCounter,

    /// Cache lookups that failed and degraded to a miss
    pub cache_lookup_failures_total: IntCounter,

    /// Keys with a producer call currently in flight
    pub in_flight_resolutions: Gauge,

    /// Entries in the backing store, when it can count them
    pub store_entries: Gauge,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl AsideMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "aside_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "aside_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            resolutions_total: register_counter_vec!(
                "aside_resolutions_total",
                "Total number of cache-aside resolutions",
                &["namespace", "outcome"]
            )
            .map_err(|e| registration_error("resolutions_total", e))?,

            resolution_duration_seconds: register_histogram_vec!(
                "aside_resolution_duration_seconds",
                "Resolution duration in seconds",
                &["namespace", "outcome"],
                RESOLUTION_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("resolution_duration_seconds", e))?,

            cache_write_failures_total: register_int_counter!(
                "aside_cache_write_failures_total",
                "Cache writes that failed since startup"
            )
            .map_err(|e| registration_error("cache_write_failures_total", e))?,

            cache_lookup_failures_total: register_int_counter!(
                "aside_cache_lookup_failures_total",
                "Cache lookups that failed and were treated as misses since startup"
            )
            .map_err(|e| registration_error("cache_lookup_failures_total", e))?,

            in_flight_resolutions: register_gauge!(
                "aside_in_flight_resolutions",
                "Keys with a producer call currently in flight"
            )
            .map_err(|e| registration_error("in_flight_resolutions", e))?,

            store_entries: register_gauge!(
                "aside_store_entries",
                "Number of entries in the backing store"
            )
            .map_err(|e| registration_error("store_entries", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record one resolution outcome.
    pub fn record_resolution(&self, namespace: &str, outcome: &str, duration_secs: f64) {
        self.resolutions_total
            .with_label_values(&[namespace, outcome])
            .inc();
        self.resolution_duration_seconds
            .with_label_values(&[namespace, outcome])
            .observe(duration_secs);
    }

    /// Bring the failure counters up to the resolver's totals and refresh
    /// the in-flight gauge. Counters never move backwards.
    pub fn observe_resolver(&self, stats: &ResolverStats, in_flight: usize) {
        advance_to(&self.cache_write_failures_total, stats.write_failures);
        advance_to(&self.cache_lookup_failures_total, stats.lookup_failures);
        self.in_flight_resolutions.set(in_flight as f64);
    }

    pub fn set_store_entries(&self, count: u64) {
        self.store_entries.set(count as f64);
    }
}

fn advance_to(counter: &IntCounter, total: u64) {
    let behind = total.saturating_sub(counter.get());
    if behind > 0 {
        counter.inc_by(behind);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Refreshes the resolver and store gauges, then returns every registered
/// metric in the Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = match METRICS.as_ref() {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::error!(error = %e, "Metrics unavailable");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                e.message.clone().into_bytes(),
            );
        }
    };

    metrics.observe_resolver(&state.resolver.stats(), state.resolver.in_flight());
    match state.resolver.store().stats().await {
        Ok(stats) => {
            if let Some(count) = stats.entry_count {
                metrics.set_store_entries(count);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to read store stats for metrics"),
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
