//! Cache provider: maps a logical role to a concrete store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::memory::InMemoryCache;
use crate::cache::store::Cache;
use crate::config::{CacheConfig, CacheRoleConfig};

/// Logical caching domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Search, tag name and tag value responses.
    FrontendSearch,
    /// Metrics query range and instant responses.
    FrontendMetrics,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::FrontendSearch => "frontend-search",
            Role::FrontendMetrics => "frontend-metrics",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a role to a store, or `None` when caching is off for it.
pub trait CacheProvider: Send + Sync {
    fn cache_for(&self, role: Role) -> Option<Arc<dyn Cache>>;
}

/// Provider built from the `[cache]` configuration section.
///
/// Every enabled role gets its own in-memory store.
#[derive(Default)]
pub struct ConfiguredProvider {
    caches: HashMap<Role, Arc<dyn Cache>>,
}

impl ConfiguredProvider {
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut provider = Self::default();
        provider.register_from(Role::FrontendSearch, &config.search);
        provider.register_from(Role::FrontendMetrics, &config.metrics);
        provider
    }

    fn register_from(&mut self, role: Role, config: &CacheRoleConfig) {
        if !config.enabled {
            tracing::info!(role = %role, "Cache role disabled by configuration");
            return;
        }
        let cache = InMemoryCache::new(config.max_entries, config.max_item_size);
        self.caches.insert(role, Arc::new(cache));
    }

    /// Bind an explicit store to a role, replacing any configured one.
    pub fn with_cache(mut self, role: Role, cache: Arc<dyn Cache>) -> Self {
        self.caches.insert(role, cache);
        self
    }
}

impl CacheProvider for ConfiguredProvider {
    fn cache_for(&self, role: Role) -> Option<Arc<dyn Cache>> {
        self.caches.get(&role).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(Role::FrontendSearch.to_string(), "frontend-search");
        assert_eq!(Role::FrontendMetrics.as_str(), "frontend-metrics");

        let parsed: Role = serde_json::from_str("\"frontend-metrics\"").unwrap();
        assert_eq!(parsed, Role::FrontendMetrics);
    }

    #[test]
    fn test_disabled_role_has_no_cache() {
        let mut config = CacheConfig::default();
        config.metrics.enabled = false;

        let provider = ConfiguredProvider::from_config(&config);
        assert!(provider.cache_for(Role::FrontendSearch).is_some());
        assert!(provider.cache_for(Role::FrontendMetrics).is_none());
    }

    #[test]
    fn test_max_item_size_from_config() {
        let mut config = CacheConfig::default();
        config.search.max_item_size = 2048;

        let provider = ConfiguredProvider::from_config(&config);
        let cache = provider.cache_for(Role::FrontendSearch).unwrap();
        assert_eq!(cache.max_item_size(), 2048);
    }

    #[test]
    fn test_with_cache_overrides() {
        let provider = ConfiguredProvider::default()
            .with_cache(Role::FrontendMetrics, Arc::new(InMemoryCache::new(4, 0)));
        assert!(provider.cache_for(Role::FrontendSearch).is_none());
        assert_eq!(provider.cache_for(Role::FrontendMetrics).unwrap().max_item_size(), 0);
    }
}
