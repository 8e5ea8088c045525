//! Cache store contract.

use async_trait::async_trait;
use bytes::Bytes;

/// Errors a cache store may report.
///
/// None of these ever reach a client; the pipeline treats them as misses.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish before the request deadline.
    #[error("cache operation timed out")]
    Timeout,
}

/// Key/value byte store used by the frontend.
///
/// Implementations must tolerate concurrent, unsynchronized calls from
/// many requests. Callers bound every call by the request deadline and drop
/// the future when the request is cancelled.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch the value stored under `key`, `None` when absent.
    async fn fetch_key(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store `values[i]` under `keys[i]`.
    async fn store(&self, keys: &[String], values: &[Bytes]) -> Result<(), CacheError>;

    /// Largest value the store accepts, in bytes. `0` means unlimited.
    fn max_item_size(&self) -> usize;
}
