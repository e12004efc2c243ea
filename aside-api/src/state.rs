//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use aside_core::{PagedProducer, Producer, ResolverConfig, StoreError};
use aside_producer::{HttpFetcher, HttpSearchClient};
use aside_storage::{CacheStore, InMemoryStore, LmdbStore, RedisStore, Resolver};

use crate::config::{ApiConfig, StoreBackend};
use crate::error::{ApiError, ApiResult};

/// The resolver as the API uses it: over whichever store was configured.
pub type ApiResolver = Resolver<dyn CacheStore>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ApiResolver>,
    /// Producer for `POST /fetch`.
    pub fetcher: Arc<dyn Producer>,
    /// Producer for `POST /search`.
    pub searcher: Arc<dyn PagedProducer>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CacheStore>,
        config: ResolverConfig,
        fetcher: Arc<dyn Producer>,
        searcher: Arc<dyn PagedProducer>,
    ) -> Self {
        Self {
            resolver: Arc::new(Resolver::new(store, config)),
            fetcher,
            searcher,
            start_time: Instant::now(),
        }
    }

    /// Build the state for a configured service: HTTP producers over the
    /// given store handle.
    pub fn from_config(config: &ApiConfig, store: &StoreHandle) -> ApiResult<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout)
            .map_err(|e| ApiError::internal_error(e.message))?;
        let searcher = HttpSearchClient::new(
            config.search_endpoint.clone(),
            config.search_api_key.clone(),
            config.fetch_timeout,
        )
        .map_err(|e| ApiError::internal_error(e.message))?;

        Ok(Self::new(
            store.as_dyn(),
            config.resolver.clone(),
            Arc::new(fetcher),
            Arc::new(searcher),
        ))
    }
}

impl axum::extract::FromRef<AppState> for Arc<ApiResolver> {
    fn from_ref(state: &AppState) -> Self {
        state.resolver.clone()
    }
}

impl axum::extract::FromRef<AppState> for Instant {
    fn from_ref(state: &AppState) -> Self {
        state.start_time
    }
}

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Owned handle to the configured backing store.
///
/// Opened once in `main`, shared with the resolver as `Arc<dyn CacheStore>`,
/// and released on shutdown.
#[derive(Clone)]
pub enum StoreHandle {
    Lmdb(Arc<LmdbStore>),
    Redis(Arc<RedisStore>),
    Memory(Arc<InMemoryStore>),
}

impl StoreHandle {
    /// Open the store named by the configuration.
    pub async fn open(backend: &StoreBackend) -> Result<Self, StoreError> {
        match backend {
            StoreBackend::Lmdb { path, map_size_mb } => {
                let store = LmdbStore::open(path, *map_size_mb)?;
                Ok(Self::Lmdb(Arc::new(store)))
            }
            StoreBackend::Redis { url } => {
                let store = RedisStore::connect(url).await?;
                tracing::info!("Connected to Redis store");
                Ok(Self::Redis(Arc::new(store)))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; cached values are lost on restart");
                Ok(Self::Memory(Arc::new(InMemoryStore::new())))
            }
        }
    }

    pub fn as_dyn(&self) -> Arc<dyn CacheStore> {
        match self {
            Self::Lmdb(store) => store.clone(),
            Self::Redis(store) => store.clone(),
            Self::Memory(store) => store.clone(),
        }
    }

    /// Flush what needs flushing before the process exits.
    pub fn shutdown(&self) -> Result<(), StoreError> {
        match self {
            Self::Lmdb(store) => store.sync(),
            Self::Redis(_) | Self::Memory(_) => Ok(()),
        }
    }
}
