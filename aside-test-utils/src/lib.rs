//! aside test utilities
//!
//! Shared test infrastructure for the aside workspace:
//! - Counting and scripted producers
//! - A fault-injecting cache store
//! - Page fixtures
//! - Proptest generators for keys and search parameters

pub use aside_core::{
    CacheKey, KeyNamespace, PageLimits, PageStream, PagedProducer, Producer, SearchPage,
    SearchParams, StoreError, UpstreamError,
};
pub use aside_storage::{CacheStore, InMemoryStore, StoreKind, StoreStats};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::json;

// ============================================================================
// PRODUCERS
// ============================================================================

/// Single-shot producer that returns a fixed result and counts calls.
#[derive(Debug)]
pub struct CountingProducer {
    response: Result<Vec<u8>, UpstreamError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl CountingProducer {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            response: Ok(body.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: UpstreamError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Producer for CountingProducer {
    async fn produce(&self, _key: &CacheKey) -> Result<Vec<u8>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

/// Paginated producer that replays a fixed script of pages.
///
/// Each call yields the same script, truncated to `limits.max_pages`.
#[derive(Debug)]
pub struct ScriptedPagedProducer {
    pages: Vec<Result<SearchPage, UpstreamError>>,
    request_error: Option<UpstreamError>,
    page_delay: Option<Duration>,
    calls: AtomicUsize,
    last_limits: Mutex<Option<PageLimits>>,
}

impl ScriptedPagedProducer {
    pub fn new(pages: Vec<Result<SearchPage, UpstreamError>>) -> Self {
        Self {
            pages,
            request_error: None,
            page_delay: None,
            calls: AtomicUsize::new(0),
            last_limits: Mutex::new(None),
        }
    }

    /// Producer whose pages all succeed.
    pub fn with_pages(pages: Vec<SearchPage>) -> Self {
        Self::new(pages.into_iter().map(Ok).collect())
    }

    /// Producer whose initial request fails before any page.
    pub fn failing(error: UpstreamError) -> Self {
        let mut producer = Self::new(Vec::new());
        producer.request_error = Some(error);
        producer
    }

    /// Sleep before yielding each page.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Limits passed on the most recent call.
    pub fn last_limits(&self) -> Option<PageLimits> {
        self.last_limits.lock().ok().and_then(|guard| *guard)
    }
}

#[async_trait]
impl PagedProducer for ScriptedPagedProducer {
    async fn search(
        &self,
        _key: &CacheKey,
        limits: PageLimits,
    ) -> Result<PageStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_limits.lock() {
            *guard = Some(limits);
        }
        if let Some(error) = &self.request_error {
            return Err(error.clone());
        }

        let take = usize::try_from(limits.max_pages).unwrap_or(usize::MAX);
        let pages: Vec<_> = self.pages.iter().take(take).cloned().collect();
        let delay = self.page_delay;

        Ok(stream::iter(pages)
            .then(move |page| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                page
            })
            .boxed())
    }
}

// ============================================================================
// STORES
// ============================================================================

/// In-memory store with switchable read and write faults.
#[derive(Debug)]
pub struct FlakyStore {
    inner: InMemoryStore,
    kind: StoreKind,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    set_attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(kind: StoreKind) -> Self {
        Self {
            inner: InMemoryStore::new(),
            kind,
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            set_attempts: AtomicUsize::new(0),
        }
    }

    /// Make every `get` fail with `Unavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Make every `set` fail with `CommitFailed`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    /// Number of `set` calls, including failed ones.
    pub fn set_attempts(&self) -> usize {
        self.set_attempts.load(Ordering::SeqCst)
    }

    /// Seed a value without counting it as a write attempt.
    pub async fn seed(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }

    /// Read through to the backing map, ignoring injected faults.
    pub async fn peek(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.inner.get(key).await.ok()
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    async fn get(&self, key: &CacheKey) -> Result<Vec<u8>, StoreError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("injected read fault"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, value: &[u8]) -> Result<(), StoreError> {
        self.set_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::commit_failed("injected write fault"));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, StoreError> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(StoreError::commit_failed("injected write fault"));
        }
        self.inner.delete(key).await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.inner.stats().await
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// `pages` pages of `per_page` items each, chained by page tokens.
///
/// Item ids are `"{query}-{page}-{n}"` so order is easy to assert.
pub fn search_pages(query: &str, pages: usize, per_page: usize) -> Vec<SearchPage> {
    (0..pages)
        .map(|page| SearchPage {
            page_token: (page > 0).then(|| format!("token-{page}")),
            next_page_token: (page + 1 < pages).then(|| format!("token-{}", page + 1)),
            items: (0..per_page)
                .map(|n| json!({ "id": format!("{query}-{page}-{n}"), "kind": "video" }))
                .collect(),
        })
        .collect()
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Keyword strings including case and whitespace variations.
    pub fn arb_keywords() -> impl Strategy<Value = String> {
        "[ a-zA-Z0-9\\t]{0,40}"
    }

    /// Plausible http(s) URLs.
    pub fn arb_url() -> impl Strategy<Value = String> {
        ("https?", "[a-z]{1,12}", "[a-z0-9/._-]{0,60}")
            .prop_map(|(scheme, host, path)| format!("{scheme}://{host}.example/{path}"))
    }

    /// Raw request parameters, including zero and negative values.
    pub fn arb_search_params() -> impl Strategy<Value = SearchParams> {
        (-10i64..=50, -10i64..=10).prop_map(|(per_page, pages)| SearchParams::new(per_page, pages))
    }

    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        prop_oneof![
            arb_url().prop_map(CacheKey::fetch),
            arb_keywords().prop_map(CacheKey::search),
        ]
    }
}
