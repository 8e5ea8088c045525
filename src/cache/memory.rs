//! Bounded in-process cache store.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

use crate::cache::store::{Cache, CacheError};

/// A thread-safe in-memory store.
///
/// Holds at most `max_entries` values. Once full, new keys are dropped
/// while existing keys can still be overwritten; there is no eviction.
#[derive(Clone)]
pub struct InMemoryCache {
    inner: Arc<DashMap<String, Bytes>>,
    max_entries: usize,
    max_item_size: usize,
}

impl InMemoryCache {
    pub fn new(max_entries: usize, max_item_size: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_entries,
            max_item_size,
        }
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn fetch_key(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn store(&self, keys: &[String], values: &[Bytes]) -> Result<(), CacheError> {
        for (key, value) in keys.iter().zip(values) {
            if self.max_item_size > 0 && value.len() > self.max_item_size {
                tracing::debug!(key = %key, size = value.len(), "Value exceeds max item size, not stored");
                continue;
            }
            if self.inner.len() >= self.max_entries && !self.inner.contains_key(key) {
                tracing::debug!(key = %key, entries = self.inner.len(), "Cache full, not stored");
                continue;
            }
            self.inner.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn max_item_size(&self) -> usize {
        self.max_item_size
    }
}
