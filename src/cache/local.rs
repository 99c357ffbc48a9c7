//! Bounded in-process cache tier.
//!
//! Insertion-ordered: when full, the oldest inserted entry is evicted.
//! Reads use `peek` and replacements `peek_mut`, so neither refreshes an
//! entry's position in the underlying LRU list.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::cache::{CacheEntry, CacheKey};

pub struct LocalCache {
    capacity: usize,
    /// `None` when the capacity is zero.
    entries: Option<Mutex<LruCache<CacheKey, CacheEntry>>>,
}

impl LocalCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let entries = self.entries.as_ref()?;
        let entries = entries.lock().expect("local cache mutex poisoned");
        entries.peek(key).cloned()
    }

    /// Insert, returning the evicted key if the tier was full.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) -> Option<CacheKey> {
        let entries = self.entries.as_ref()?;
        let mut entries = entries.lock().expect("local cache mutex poisoned");
        if let Some(existing) = entries.peek_mut(&key) {
            *existing = entry;
            return None;
        }
        entries.push(key, entry).map(|(evicted, _)| evicted)
    }

    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().expect("local cache mutex poisoned").clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| {
            entries.lock().expect("local cache mutex poisoned").len()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
