//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the query
//! frontend. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the query frontend.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FrontendConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Querier the frontend forwards requests to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3200").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3200".to_string(),
        }
    }
}

/// Upstream querier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the querier (scheme, host and port).
    pub querier_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            querier_url: "http://127.0.0.1:3201".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store for search, tag and tag value responses.
    pub search: CacheRoleConfig,

    /// Store for metrics query responses.
    pub metrics: CacheRoleConfig,

    /// A time range must end at least this many seconds ago to be cached.
    pub min_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search: CacheRoleConfig::default(),
            metrics: CacheRoleConfig::default(),
            min_age_secs: 300,
        }
    }
}

/// Settings for the store bound to one cache role.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheRoleConfig {
    /// Enable caching for this role.
    pub enabled: bool,

    /// Largest cacheable response in bytes (0 = unlimited).
    pub max_item_size: usize,

    /// Maximum number of stored responses.
    pub max_entries: usize,
}

impl Default for CacheRoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_item_size: 1024 * 1024, // 1MB
            max_entries: 10_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error), used when RUST_LOG is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
