//! Shared cache tier contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::CacheEntry;

/// Failures talking to a shared store. Always treated as a soft miss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store call exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("shared backend '{backend}' is not compiled into this build")]
    Unsupported { backend: &'static str },

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A store shared across resolutions (and, for networked backends,
/// across processes). Writes are idempotent, so last-writer-wins is safe.
#[async_trait]
pub trait SharedStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError>;

    /// Remove every entry this store owns.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Backend name for logs and stats.
    fn name(&self) -> &'static str;
}
