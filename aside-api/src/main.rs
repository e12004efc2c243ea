//! aside API Server Entry Point
//!
//! Bootstraps configuration, opens the backing store and starts the Axum
//! HTTP server. The store is flushed after the server stops.

use axum::Router;
use aside_api::telemetry::init_tracing;
use aside_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState, StoreHandle};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing()?;

    let config = ApiConfig::from_env()?;
    let store = StoreHandle::open(&config.store).await?;
    let state = AppState::from_config(&config, &store)?;

    tracing::info!(
        store = config.store.name(),
        search_endpoint = %config.search_endpoint,
        write_policy = config.resolver.write_policy.as_str(),
        coalesce = config.resolver.coalesce_in_flight,
        "Resolver configured"
    );

    let app: Router = create_api_router(state, &config);

    let addr = config.bind_addr;
    tracing::info!(%addr, "Starting aside API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    if let Err(e) = store.shutdown() {
        tracing::error!(error = %e, "Failed to flush store on shutdown");
    }
    tracing::info!("Shutdown complete");

    Ok(())
}
