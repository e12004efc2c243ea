//! Resolver configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// What happens when persisting a freshly produced value fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Log the failure and return the produced value anyway.
    #[default]
    BestEffort,
    /// Fail the request when the write does not commit.
    Durable,
}

impl WritePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestEffort => "best_effort",
            Self::Durable => "durable",
        }
    }

    /// Parse from configuration. Accepts `-` or `_` as separator.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "durable" => Ok(Self::Durable),
            _ => Err(ConfigError::InvalidValue {
                field: "write_policy".to_string(),
                value: value.to_string(),
                reason: "expected best_effort or durable".to_string(),
            }),
        }
    }
}

/// Configuration for the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Policy for cache writes after a miss.
    pub write_policy: WritePolicy,
    /// Share one producer call among concurrent misses for the same key.
    pub coalesce_in_flight: bool,
    /// Upper bound on a producer call, including draining every page.
    pub produce_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            write_policy: WritePolicy::BestEffort,
            coalesce_in_flight: true,
            produce_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_in_flight = enabled;
        self
    }

    pub fn with_produce_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.produce_timeout = timeout;
        self
    }
}
