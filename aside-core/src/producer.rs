//! Producer traits.
//!
//! Producers are the source of truth invoked on a cache miss. Concrete HTTP
//! implementations live in aside-producer; the resolver in aside-storage only
//! sees these traits.

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};

use crate::error::UpstreamError;
use crate::key::CacheKey;
use crate::search::{PageLimits, SearchPage};

/// Ordered, finite, non-restartable sequence of result pages.
pub type PageStream = BoxStream<'static, Result<SearchPage, UpstreamError>>;

/// Single-shot producer: one request, full body.
#[async_trait]
pub trait Producer: Send + Sync {
    async fn produce(&self, key: &CacheKey) -> Result<Vec<u8>, UpstreamError>;
}

/// Paginated producer.
///
/// Errors from issuing the request are returned directly; errors while
/// fetching later pages are yielded by the stream.
#[async_trait]
pub trait PagedProducer: Send + Sync {
    async fn search(&self, key: &CacheKey, limits: PageLimits)
        -> Result<PageStream, UpstreamError>;
}

/// Consume every page in delivery order.
///
/// The first failed page aborts the drain; pages already received are
/// discarded with it.
pub async fn drain_pages(mut stream: PageStream) -> Result<Vec<SearchPage>, UpstreamError> {
    let mut pages = Vec::new();
    while let Some(page) = stream.next().await {
        pages.push(page?);
    }
    Ok(pages)
}
