//! Cache-aside resolver.
//!
//! Implements lookup -> miss -> produce -> commit -> return over any
//! [`CacheStore`]. The store is an optimization; the producer is the source
//! of truth:
//!
//! - Lookup errors degrade to a miss.
//! - An empty stored value is a miss.
//! - Producer errors always propagate and never write.
//! - Write failures are logged and swallowed unless the write policy is
//!   [`WritePolicy::Durable`].
//!
//! Multi-page results are drained completely before anything is persisted,
//! so a timed-out, cancelled or failed drain leaves the store untouched.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aside_core::{
    drain_pages, encode_blob, encode_pages, AsideError, AsideResult, CacheKey, PagedProducer,
    Producer, ResolverConfig, SearchParams, StoreError, UpstreamError, WritePolicy,
};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::Instrument;

use super::resolution::Resolution;
use super::traits::CacheStore;

/// Outcome of one producer run, shared with every caller that joined it.
type SharedOutcome = Arc<OnceCell<AsideResult<Vec<u8>>>>;

type InFlight = DashMap<CacheKey, SharedOutcome>;

/// Removes a key's in-flight entry when the producer run that owns it ends,
/// whether it finished or was dropped mid-flight.
struct InFlightGuard<'a> {
    table: &'a InFlight,
    key: &'a CacheKey,
    cell: SharedOutcome,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table
            .remove_if(self.key, |_, current| Arc::ptr_eq(current, &self.cell));
    }
}

/// Resolution orchestrator.
///
/// Cheap to share behind an `Arc`; holds no per-request state apart from
/// the in-flight table used for coalescing.
///
/// # Example
///
/// ```ignore
/// let resolver = Resolver::new(Arc::new(store), ResolverConfig::default());
///
/// let resolution = resolver
///     .search(&CacheKey::search("golang concurrency"), SearchParams::new(5, 2), &client)
///     .await?;
/// ```
pub struct Resolver<S: CacheStore + ?Sized> {
    store: Arc<S>,
    config: ResolverConfig,
    in_flight: InFlight,
    stats: ResolverCounters,
}

impl<S: CacheStore + ?Sized> Resolver<S> {
    pub fn new(store: Arc<S>, config: ResolverConfig) -> Self {
        Self {
            store,
            config,
            in_flight: DashMap::new(),
            stats: ResolverCounters::default(),
        }
    }

    /// Create a resolver with the default configuration.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, ResolverConfig::default())
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Snapshot of outcome counters since startup.
    pub fn stats(&self) -> ResolverStats {
        self.stats.snapshot()
    }

    /// Number of keys with a producer call currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Resolve a byte blob through a single-shot producer.
    pub async fn fetch<P>(&self, key: &CacheKey, producer: &P) -> AsideResult<Resolution>
    where
        P: Producer + ?Sized,
    {
        self.resolve(key, || async move {
            let body = producer.produce(key).await?;
            Ok(encode_blob(body))
        })
        .await
    }

    /// Resolve a paginated search.
    ///
    /// Non-positive limits in `params` are replaced by the defaults before
    /// the producer is called. The stored value is the JSON array of every
    /// page in delivery order.
    pub async fn search<P>(
        &self,
        key: &CacheKey,
        params: SearchParams,
        producer: &P,
    ) -> AsideResult<Resolution>
    where
        P: PagedProducer + ?Sized,
    {
        let limits = params.with_default_limits();
        self.resolve(key, || async move {
            let stream = producer.search(key, limits).await?;
            let pages = drain_pages(stream).await?;
            tracing::debug!(pages = pages.len(), "drained result pages");
            Ok(encode_pages(&pages)?)
        })
        .await
    }

    async fn resolve<F, Fut>(&self, key: &CacheKey, produce: F) -> AsideResult<Resolution>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AsideResult<Vec<u8>>>,
    {
        let span = tracing::info_span!(
            "resolve",
            namespace = %key.namespace(),
            key = %key.as_str_lossy(),
        );

        async move {
            if let Some(value) = self.lookup(key).await {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(bytes = value.len(), "cache hit");
                return Ok(Resolution::from_cache(value));
            }

            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("cache miss");

            if !self.config.coalesce_in_flight {
                return self
                    .produce_and_persist(key, produce)
                    .await
                    .map(Resolution::from_producer);
            }

            self.resolve_coalesced(key, produce).await
        }
        .instrument(span)
        .await
    }

    /// Share one producer call among concurrent misses for `key`.
    ///
    /// The first caller to reach the cell runs the producer and every caller
    /// already waiting on it receives the same outcome, success or failure.
    /// Only a dropped run leaves the cell empty, in which case the next
    /// waiter runs its own attempt.
    async fn resolve_coalesced<F, Fut>(&self, key: &CacheKey, produce: F) -> AsideResult<Resolution>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AsideResult<Vec<u8>>>,
    {
        let cell = Arc::clone(
            &self
                .in_flight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        );

        let mut ran = false;
        let outcome = cell
            .get_or_init(|| {
                ran = true;
                let guard = InFlightGuard {
                    table: &self.in_flight,
                    key,
                    cell: Arc::clone(&cell),
                };
                async move {
                    let _guard = guard;
                    self.produce_and_persist(key, produce).await
                }
            })
            .await
            .clone();

        if ran {
            return outcome.map(Resolution::from_producer);
        }

        match outcome {
            Ok(value) => {
                self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("joined in-flight resolution");
                Ok(Resolution::coalesced(value))
            }
            Err(e) => {
                tracing::debug!(error = %e, "joined in-flight resolution that failed");
                Err(e)
            }
        }
    }

    /// Look the key up. Anything other than a non-empty value is a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match self.store.get(key).await {
            Ok(value) if !value.is_empty() => Some(value),
            Ok(_) => {
                tracing::debug!("stored value is empty, treating as miss");
                None
            }
            Err(StoreError::NotFound) => None,
            Err(e) => {
                self.stats.lookup_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, store = self.store.kind().as_str(), "cache lookup failed, computing fresh value");
                None
            }
        }
    }

    async fn produce_and_persist<F, Fut>(&self, key: &CacheKey, produce: F) -> AsideResult<Vec<u8>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AsideResult<Vec<u8>>>,
    {
        let produced = match self.config.produce_timeout {
            Some(limit) => match tokio::time::timeout(limit, produce()).await {
                Ok(result) => result,
                Err(_) => Err(AsideError::from(UpstreamError::timed_out(limit))),
            },
            None => produce().await,
        };

        let value = match produced {
            Ok(value) => value,
            Err(e) => {
                self.stats.upstream_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, status = ?e.upstream_status(), "producer failed, nothing cached");
                return Err(e);
            }
        };

        self.persist(key, &value).await?;
        Ok(value)
    }

    async fn persist(&self, key: &CacheKey, value: &[u8]) -> AsideResult<()> {
        let Err(e) = self.store.set(key, value).await else {
            tracing::debug!(bytes = value.len(), "cached produced value");
            return Ok(());
        };

        self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
        match self.config.write_policy {
            WritePolicy::BestEffort => {
                tracing::warn!(error = %e, store = self.store.kind().as_str(), "cache write failed, returning produced value");
                Ok(())
            }
            WritePolicy::Durable => {
                tracing::error!(error = %e, store = self.store.kind().as_str(), "cache write failed under durable policy");
                Err(e.into())
            }
        }
    }
}

#[derive(Debug, Default)]
struct ResolverCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    lookup_failures: AtomicU64,
    upstream_errors: AtomicU64,
    write_failures: AtomicU64,
}

impl ResolverCounters {
    fn snapshot(&self) -> ResolverStats {
        ResolverStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Resolver outcome counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub hits: u64,
    /// Lookups that found nothing usable, including absorbed store errors.
    pub misses: u64,
    /// Misses served by another caller's producer run.
    pub coalesced: u64,
    pub lookup_failures: u64,
    pub upstream_errors: u64,
    pub write_failures: u64,
}
