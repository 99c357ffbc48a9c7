//! Two-tier resolution cache.
//!
//! # Data Flow
//! ```text
//! get(key):
//!     → local.rs   (bounded FIFO, in-process)     hit → return
//!     → SharedStore (memory.rs / redis_store.rs)  hit → copy into local, return
//!     → miss: caller runs Parser → Search → Validation
//!
//! put(key, entry):
//!     → SharedStore (bounded), then local.rs
//! ```
//!
//! # Design Decisions
//! - Only successful resolutions are stored; entries hold identifiers,
//!   never live handler instances
//! - The shared tier is a soft dependency: every call is bounded by a
//!   timeout, and errors degrade to a miss or a skipped write
//! - Keys embed the configuration fingerprint (key.rs), so a config change
//!   never needs to enumerate or delete shared entries

pub mod key;
pub mod local;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod store;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::{CacheConfig, SharedBackend};
use crate::observability::metrics;
use crate::routing::ResolvedHandler;
use crate::security::SecurityVerdict;

pub use key::{config_fingerprint, CacheKey};
pub use local::LocalCache;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use store::{SharedStore, StoreError};

/// A cached successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub handler: ResolvedHandler,
    pub verdict: SecurityVerdict,
    /// Seconds since the epoch.
    pub inserted_at: u64,
}

impl CacheEntry {
    pub fn new(handler: ResolvedHandler, verdict: SecurityVerdict) -> Self {
        Self {
            handler,
            verdict,
            inserted_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub local_hits: u64,
    pub shared_hits: u64,
    pub shared_errors: u64,
    /// Entries currently held in the local tier.
    pub size: usize,
}

#[derive(Default)]
struct Counters {
    local_hits: AtomicU64,
    shared_hits: AtomicU64,
    misses: AtomicU64,
    shared_errors: AtomicU64,
}

/// The shared store chosen by configuration.
///
/// Kept as a concrete enum so the process can persist a memory store on
/// shutdown while the cache sees only `dyn SharedStore`.
#[derive(Clone)]
pub enum SharedTier {
    Memory(MemoryStore),
    #[cfg(feature = "redis")]
    Redis(RedisStore),
}

impl SharedTier {
    pub async fn open(config: &CacheConfig) -> Result<Self, StoreError> {
        let ttl = (config.shared_ttl_secs > 0).then(|| Duration::from_secs(config.shared_ttl_secs));
        match config.shared_backend {
            SharedBackend::Memory => {
                let store = match &config.persistence_path {
                    Some(path) => MemoryStore::load_from_file(path, ttl)?,
                    None => MemoryStore::new(ttl),
                };
                Ok(SharedTier::Memory(store))
            }
            #[cfg(feature = "redis")]
            SharedBackend::Redis => {
                let store = RedisStore::connect(&config.redis_url, &config.key_prefix, ttl).await?;
                Ok(SharedTier::Redis(store))
            }
            #[cfg(not(feature = "redis"))]
            SharedBackend::Redis => Err(StoreError::Unsupported { backend: "redis" }),
        }
    }

    pub fn store(&self) -> Arc<dyn SharedStore> {
        match self {
            SharedTier::Memory(store) => Arc::new(store.clone()),
            #[cfg(feature = "redis")]
            SharedTier::Redis(store) => Arc::new(store.clone()),
        }
    }

    /// Flush to disk where the backend supports it.
    pub fn persist(&self) -> Result<(), StoreError> {
        match self {
            SharedTier::Memory(store) => store.save_to_file(),
            #[cfg(feature = "redis")]
            SharedTier::Redis(_) => Ok(()),
        }
    }
}

/// Local tier in front of an optional shared store.
pub struct ResolutionCache {
    enabled: bool,
    local: LocalCache,
    shared: Option<Arc<dyn SharedStore>>,
    shared_timeout: Duration,
    counters: Counters,
}

impl ResolutionCache {
    pub fn new(config: &CacheConfig, shared: Option<Arc<dyn SharedStore>>) -> Self {
        Self {
            enabled: config.enabled,
            local: LocalCache::new(config.local_capacity),
            shared,
            shared_timeout: Duration::from_millis(config.shared_timeout_ms),
            counters: Counters::default(),
        }
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self::new(
            &CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
            None,
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn shared_backend(&self) -> Option<&'static str> {
        self.shared.as_ref().map(|s| s.name())
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }

        if let Some(entry) = self.local.get(key) {
            self.counters.local_hits.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_lookup("local", true);
            return Some(entry);
        }
        metrics::record_cache_lookup("local", false);

        if let Some(shared) = &self.shared {
            let found = self.bounded("get", shared.get(key.as_str())).await.flatten();
            metrics::record_cache_lookup("shared", found.is_some());
            if let Some(entry) = found {
                self.counters.shared_hits.fetch_add(1, Ordering::Relaxed);
                self.local.put(key.clone(), entry.clone());
                metrics::record_local_entries(self.local.len());
                return Some(entry);
            }
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn put(&self, key: CacheKey, entry: CacheEntry) {
        if !self.enabled {
            return;
        }
        if let Some(shared) = &self.shared {
            self.bounded("put", shared.put(key.as_str(), &entry)).await;
        }
        if let Some(evicted) = self.local.put(key, entry) {
            tracing::trace!(key = %evicted, "Evicted oldest local cache entry");
        }
        metrics::record_local_entries(self.local.len());
    }

    /// Drop the local tier only. Shared entries keyed under an old
    /// fingerprint become unreachable on their own.
    pub fn clear_local(&self) {
        self.local.clear();
        metrics::record_local_entries(0);
    }

    pub async fn invalidate_all(&self) {
        self.clear_local();
        if let Some(shared) = &self.shared {
            self.bounded("clear", shared.clear()).await;
        }
        tracing::info!(shared = ?self.shared_backend(), "Resolution cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let local_hits = self.counters.local_hits.load(Ordering::Relaxed);
        let shared_hits = self.counters.shared_hits.load(Ordering::Relaxed);
        CacheStats {
            hits: local_hits + shared_hits,
            misses: self.counters.misses.load(Ordering::Relaxed),
            local_hits,
            shared_hits,
            shared_errors: self.counters.shared_errors.load(Ordering::Relaxed),
            size: self.local.len(),
        }
    }

    /// Run a shared-store call under the timeout; failures become `None`.
    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Option<T> {
        let result = match tokio::time::timeout(self.shared_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                timeout_ms: self.shared_timeout.as_millis() as u64,
            }),
        };
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.counters.shared_errors.fetch_add(1, Ordering::Relaxed);
                metrics::record_shared_error(op);
                tracing::warn!(
                    backend = self.shared_backend().unwrap_or("none"),
                    op,
                    error = %e,
                    "Shared cache call failed, continuing without it"
                );
                None
            }
        }
    }
}
