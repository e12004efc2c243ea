//! aside storage - cache stores and the resolver
//!
//! Backing store adapters (LMDB, Redis, in-memory) behind one
//! [`CacheStore`] trait, and the cache-aside [`Resolver`] that drives them.

pub mod cache;

pub use cache::{
    CacheStore, InMemoryStore, LmdbStore, LmdbStoreError, RedisStore, Resolution,
    ResolutionSource, Resolver, ResolverStats, StoreKind, StoreStats, LMDB_MAX_KEY_SIZE,
    REDIS_MAX_KEY_SIZE,
};
