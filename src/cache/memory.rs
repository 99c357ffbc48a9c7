//! In-process shared store with optional TTL and JSON persistence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::cache::store::{SharedStore, StoreError};
use crate::cache::CacheEntry;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    entry: CacheEntry,
    /// Milliseconds since the epoch; `None` never expires.
    expires_at: Option<u64>,
}

impl StoredEntry {
    fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Concurrent map store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, StoredEntry>>,
    ttl: Option<Duration>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// `ttl` of `None` keeps entries until cleared.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
            persistence_path: None,
        }
    }

    /// Load from file if it exists; later saves go to the same path.
    pub fn load_from_file(path: impl AsRef<Path>, ttl: Option<Duration>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let mut store = Self::new(ttl);
        store.persistence_path = Some(path.to_path_buf());

        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let map: HashMap<String, StoredEntry> = serde_json::from_reader(reader)?;
            let now = now_millis();
            for (key, stored) in map {
                if !stored.is_expired(now) {
                    store.inner.insert(key, stored);
                }
            }
            tracing::info!(
                path = %path.display(),
                entries = store.inner.len(),
                "Loaded resolution cache from file"
            );
        }
        Ok(store)
    }

    /// Write live entries to the persistence path, if one is set.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let now = now_millis();
        let map: HashMap<String, StoredEntry> = self
            .inner
            .iter()
            .filter(|r| !r.value().is_expired(now))
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &map)?;
        tracing::info!(path = %path.display(), entries = map.len(), "Saved resolution cache to file");
        Ok(())
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let now = now_millis();
        let found = self
            .inner
            .get(key)
            .map(|stored| (!stored.is_expired(now)).then(|| stored.entry.clone()));
        match found {
            None => Ok(None),
            Some(Some(entry)) => Ok(Some(entry)),
            Some(None) => {
                self.inner.remove_if(key, |_, stored| stored.is_expired(now));
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        let expires_at = self.ttl.map(|ttl| now_millis() + ttl.as_millis() as u64);
        self.inner.insert(
            key.to_string(),
            StoredEntry {
                entry: entry.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{PatternParser, ResolvedHandler};
    use crate::security::SecurityVerdict;

    fn entry() -> CacheEntry {
        CacheEntry::new(
            ResolvedHandler {
                type_name: "App.Http.Controllers.UsersController".to_string(),
                method: "index".to_string(),
                pattern: PatternParser::new(200).parse("users@index").unwrap(),
            },
            SecurityVerdict::Approved,
        )
    }

    #[tokio::test]
    async fn test_get_put_clear() {
        let store = MemoryStore::new(None);
        assert!(store.get("k").await.unwrap().is_none());

        store.put("k", &entry()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().unwrap().handler, entry().handler);
        assert_eq!(store.len(), 1);

        store.clear().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let a = MemoryStore::new(None);
        let b = a.clone();
        a.put("k", &entry()).await.unwrap();
        assert!(b.get("k").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = MemoryStore::new(Some(Duration::from_millis(20)));
        store.put("k", &entry()).await.unwrap();
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let store = MemoryStore::load_from_file(&path, None).unwrap();
        assert!(store.is_empty());
        store.put("k", &entry()).await.unwrap();
        store.save_to_file().unwrap();

        let reloaded = MemoryStore::load_from_file(&path, None).unwrap();
        assert_eq!(reloaded.get("k").await.unwrap().unwrap().handler, entry().handler);
    }

    #[test]
    fn test_expired_records_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let stale = StoredEntry {
            entry: entry(),
            expires_at: Some(1),
        };
        let map = HashMap::from([("old".to_string(), stale)]);
        std::fs::write(&path, serde_json::to_vec(&map).unwrap()).unwrap();

        let store = MemoryStore::load_from_file(&path, None).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            MemoryStore::load_from_file(&path, None),
            Err(StoreError::Serialization(_))
        ));
    }
}
