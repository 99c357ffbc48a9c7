//! Redis-backed shared store.
//!
//! Records are JSON under `{key_prefix}{key}`. With a TTL configured they
//! are written with `SET EX`; `clear` removes every key under the prefix.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::cache::store::{SharedStore, StoreError};
use crate::cache::CacheEntry;

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    key_prefix: String,
    ttl: Option<Duration>,
}

impl RedisStore {
    pub async fn connect(
        url: &str,
        key_prefix: impl Into<String>,
        ttl: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            key_prefix: key_prefix.into(),
            ttl,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub async fn ping(&self) -> Result<bool, StoreError> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let mut conn = self.manager.clone();
        let json: Option<String> = conn.get(self.full_key(key)).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let json = serde_json::to_string(entry)?;
        match self.ttl {
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(self.full_key(key), json, ttl.as_secs().max(1) as usize)
                    .await?
            }
            None => conn.set::<_, _, ()>(self.full_key(key), json).await?,
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", self.key_prefix);
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await?;
        if !keys.is_empty() {
            conn.del::<_, ()>(&keys).await?;
        }
        tracing::debug!(prefix = %self.key_prefix, removed = keys.len(), "Cleared redis cache keys");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
