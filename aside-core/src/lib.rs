//! aside core - keys, errors, codec and producer contracts
//!
//! Leaf crate shared by the storage adapters, the producers and the API
//! layer. Holds no I/O.

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod producer;
pub mod search;

pub use codec::{decode_pages, encode_blob, encode_pages};
pub use config::{ResolverConfig, WritePolicy};
pub use error::{AsideError, AsideResult, CodecError, ConfigError, StoreError, UpstreamError};
pub use key::{normalize, CacheKey, KeyNamespace};
pub use producer::{drain_pages, PageStream, PagedProducer, Producer};
pub use search::{
    PageLimits, SearchPage, SearchParams, DEFAULT_MAX_PAGES, DEFAULT_MAX_PER_PAGE,
};
