//! API Configuration Module
//!
//! Configuration is loaded from environment variables with defaults suited
//! to local development. Values drawn from a closed set (store backend,
//! write policy, booleans) are validated; an unknown value is an error
//! rather than a silent fallback.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use aside_core::{ConfigError, ResolverConfig, WritePolicy};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8778;

/// Default search endpoint (YouTube Data API v3 search).
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/search";

// ============================================================================
// STORE BACKEND
// ============================================================================

/// Which backing store the resolver runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Embedded LMDB environment.
    Lmdb { path: PathBuf, map_size_mb: usize },
    /// Shared Redis instance.
    Redis { url: String },
    /// Process-local map, lost on restart.
    Memory,
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lmdb { .. } => "lmdb",
            Self::Redis { .. } => "redis",
            Self::Memory => "memory",
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: SocketAddr,

    pub store: StoreBackend,

    /// Search API URL, without query string.
    pub search_endpoint: String,

    /// Search API key, sent as the `key` query parameter.
    pub search_api_key: Option<String>,

    /// Per-request timeout for outbound HTTP calls.
    pub fetch_timeout: Duration,

    /// Resolver behavior: write policy, coalescing, produce deadline.
    pub resolver: ResolverConfig,

    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            store: StoreBackend::Lmdb {
                path: PathBuf::from("./data/aside-cache"),
                map_size_mb: 256,
            },
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_api_key: None,
            fetch_timeout: Duration::from_secs(30),
            resolver: ResolverConfig::default(),
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ASIDE_API_BIND`: Listen address (default: 0.0.0.0)
    /// - `PORT` or `ASIDE_API_PORT`: Listen port, `PORT` wins (default: 8778)
    /// - `ASIDE_STORE`: `lmdb`, `redis` or `memory` (default: lmdb)
    /// - `ASIDE_LMDB_PATH`: LMDB directory (default: ./data/aside-cache)
    /// - `ASIDE_LMDB_MAP_SIZE_MB`: LMDB map size (default: 256)
    /// - `ASIDE_REDIS_URL`: Redis URL (default: redis://127.0.0.1:6379)
    /// - `ASIDE_SEARCH_ENDPOINT`: Search API URL (default: YouTube v3 search)
    /// - `ASIDE_SEARCH_API_KEY`: Search API key (default: none)
    /// - `ASIDE_FETCH_TIMEOUT_SECS`: Outbound request timeout (default: 30)
    /// - `ASIDE_PRODUCE_TIMEOUT_SECS`: Producer deadline, 0 disables (default: 60)
    /// - `ASIDE_WRITE_POLICY`: `best_effort` or `durable` (default: best_effort)
    /// - `ASIDE_COALESCE`: "true" or "false" (default: true)
    /// - `ASIDE_MAX_BODY_BYTES`: Request body limit (default: 65536)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup("ASIDE_API_BIND") {
            Some(value) => value.trim().parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                field: "ASIDE_API_BIND".to_string(),
                value,
                reason: "expected an IP address".to_string(),
            })?,
            None => defaults.bind_addr.ip(),
        };
        let port_field = if lookup("PORT").is_some() {
            "PORT"
        } else {
            "ASIDE_API_PORT"
        };
        let port = parse_number(&lookup, port_field, DEFAULT_PORT)?;

        let store = match lookup("ASIDE_STORE")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("lmdb") => StoreBackend::Lmdb {
                path: lookup("ASIDE_LMDB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/aside-cache")),
                map_size_mb: parse_number(&lookup, "ASIDE_LMDB_MAP_SIZE_MB", 256)?,
            },
            Some("redis") => StoreBackend::Redis {
                url: lookup("ASIDE_REDIS_URL")
                    .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    field: "ASIDE_STORE".to_string(),
                    value: other.to_string(),
                    reason: "expected lmdb, redis or memory".to_string(),
                })
            }
        };

        let search_endpoint = lookup("ASIDE_SEARCH_ENDPOINT")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.search_endpoint);

        let search_api_key = lookup("ASIDE_SEARCH_API_KEY").filter(|s| !s.is_empty());

        let fetch_timeout =
            Duration::from_secs(parse_number(&lookup, "ASIDE_FETCH_TIMEOUT_SECS", 30)?);

        let produce_timeout = match parse_number(&lookup, "ASIDE_PRODUCE_TIMEOUT_SECS", 60)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let write_policy = match lookup("ASIDE_WRITE_POLICY") {
            Some(value) => WritePolicy::parse(&value).map_err(|_| ConfigError::InvalidValue {
                field: "ASIDE_WRITE_POLICY".to_string(),
                value,
                reason: "expected best_effort or durable".to_string(),
            })?,
            None => WritePolicy::default(),
        };

        let coalesce = match lookup("ASIDE_COALESCE") {
            Some(value) => parse_bool("ASIDE_COALESCE", &value)?,
            None => true,
        };

        let max_body_bytes = parse_number(&lookup, "ASIDE_MAX_BODY_BYTES", defaults.max_body_bytes)?;

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            store,
            search_endpoint,
            search_api_key,
            fetch_timeout,
            resolver: ResolverConfig::new()
                .with_write_policy(write_policy)
                .with_coalescing(coalesce)
                .with_produce_timeout(produce_timeout),
            max_body_bytes,
        })
    }
}

fn parse_number<F, T>(lookup: &F, field: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(field) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value,
            reason: "expected a non-negative integer".to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
