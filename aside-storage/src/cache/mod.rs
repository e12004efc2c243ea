//! Cache-aside resolution over pluggable backing stores.
//!
//! The [`Resolver`] asks a [`CacheStore`] for a key, and on a miss asks a
//! producer for a fresh value, persists it and returns it. Stores differ only
//! in their write semantics ([`StoreKind`]); the resolver treats every one of
//! them as an optimization that may fail.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(LmdbStore::open("./data/aside-cache", 256)?);
//! let resolver = Resolver::with_defaults(store);
//!
//! let resolution = resolver.fetch(&CacheKey::fetch(url), &fetcher).await?;
//! if resolution.source().is_hit() {
//!     tracing::debug!("served from cache");
//! }
//! ```

pub mod lmdb_backend;
pub mod memory;
pub mod redis_backend;
pub mod resolution;
pub mod resolver;
pub mod traits;

pub use lmdb_backend::{LmdbStore, LmdbStoreError, LMDB_MAX_KEY_SIZE};
pub use memory::InMemoryStore;
pub use redis_backend::{RedisStore, REDIS_MAX_KEY_SIZE};
pub use resolution::{Resolution, ResolutionSource};
pub use resolver::{Resolver, ResolverStats};
pub use traits::{CacheStore, StoreKind, StoreStats};
