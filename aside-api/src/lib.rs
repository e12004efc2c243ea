//! aside API - HTTP layer for cache-aside resolution
//!
//! Exposes `POST /fetch` and `POST /search` over a [`aside_storage::Resolver`],
//! plus cache administration, health checks and Prometheus metrics. Store
//! and producers are chosen at startup from [`ApiConfig`].

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{ApiConfig, StoreBackend, DEFAULT_SEARCH_ENDPOINT};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::{create_api_router, X_CACHE};
pub use state::{ApiResolver, AppState, StoreHandle};
