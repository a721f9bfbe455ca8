//! Key/value store backing the response cache: in-process memory for
//! single-instance deployments and tests, Redis for shared deployments.

use dashmap::DashMap;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Serialized cache entry shape: `{"content": ..., "status_code": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub content: String,
    pub status_code: u16,
}

/// Store faults are typed and returned to the caller; deciding that a fault
/// counts as a miss is the call site's job, not the store's.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection unavailable: {0}")]
    Connection(String),

    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

#[derive(Debug)]
pub struct MemoryEntry {
    payload: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

#[derive(Clone)]
pub enum CacheStore {
    /// Single-instance: local map with per-entry expiry
    Memory(Arc<DashMap<String, MemoryEntry>>),

    /// Shared: Redis with server-side TTL
    Redis(deadpool_redis::Pool),
}

impl CacheStore {
    /// All entries live under one namespace in the underlying store.
    const PREFIX: &'static str = "request-cache:";

    pub fn memory() -> Self {
        CacheStore::Memory(Arc::new(DashMap::new()))
    }

    pub fn redis(pool: deadpool_redis::Pool) -> Self {
        CacheStore::Redis(pool)
    }

    pub async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let namespaced = format!("{}{}", Self::PREFIX, key);

        match self {
            CacheStore::Memory(map) => {
                if let Some(entry) = map.get(&namespaced) {
                    if !entry.is_expired() {
                        return Ok(Some(serde_json::from_str(&entry.payload)?));
                    }
                    drop(entry);
                    map.remove(&namespaced);
                }
                Ok(None)
            }
            CacheStore::Redis(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))?;

                let payload: Option<String> = conn.get(&namespaced).await?;
                payload
                    .map(|p| serde_json::from_str(&p))
                    .transpose()
                    .map_err(CacheError::from)
            }
        }
    }

    pub async fn set(&self, key: &str, response: &CachedResponse, ttl: Duration) -> Result<(), CacheError> {
        let namespaced = format!("{}{}", Self::PREFIX, key);
        let payload = serde_json::to_string(response)?;

        match self {
            CacheStore::Memory(map) => {
                map.insert(
                    namespaced,
                    MemoryEntry {
                        payload,
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(())
            }
            CacheStore::Redis(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))?;

                conn.set_ex::<_, _, ()>(&namespaced, payload, ttl.as_secs()).await?;
                Ok(())
            }
        }
    }

    /// Deletes every entry whose key contains the given substring. Returns
    /// the number of removed entries.
    pub async fn remove_matching(&self, key_substring: &str) -> Result<u64, CacheError> {
        match self {
            CacheStore::Memory(map) => {
                let removed = map
                    .iter()
                    .filter(|entry| entry.key().contains(key_substring))
                    .count() as u64;
                map.retain(|key, _| !key.contains(key_substring));
                Ok(removed)
            }
            CacheStore::Redis(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::Connection(e.to_string()))?;

                let keys: Vec<String> = conn.keys(format!("*{}*", key_substring)).await?;
                if keys.is_empty() {
                    return Ok(0);
                }
                let removed: u64 = conn.del(keys).await?;
                Ok(removed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(content: &str) -> CachedResponse {
        CachedResponse {
            content: content.to_string(),
            status_code: 200,
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_equal_body() {
        let store = CacheStore::memory();
        store
            .set("/api/v1/users/?:token", &entry("{\"items\":[]}"), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = store.get("/api/v1/users/?:token").await.unwrap().unwrap();
        assert_eq!(hit, entry("{\"items\":[]}"));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let store = CacheStore::memory();
        store
            .set("short-lived", &entry("x"), Duration::from_millis(40))
            .await
            .unwrap();

        assert!(store.get("short-lived").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.get("short-lived").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_key_is_a_miss() {
        let store = CacheStore::memory();
        assert!(store.get("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_matching_deletes_by_substring() {
        let store = CacheStore::memory();
        let ttl = Duration::from_secs(60);
        store.set("/api/v1/users/:alice", &entry("a"), ttl).await.unwrap();
        store.set("/api/v1/users/42/:bob", &entry("b"), ttl).await.unwrap();
        store.set("/api/v1/orders/:alice", &entry("c"), ttl).await.unwrap();

        let removed = store.remove_matching("/users").await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.get("/api/v1/users/:alice").await.unwrap().is_none());
        assert!(store.get("/api/v1/users/42/:bob").await.unwrap().is_none());
        assert!(store.get("/api/v1/orders/:alice").await.unwrap().is_some());
    }

    #[test]
    fn cached_entry_wire_shape() {
        let value = serde_json::to_value(entry("{\"ok\":true}")).unwrap();
        assert_eq!(
            value,
            json!({ "content": "{\"ok\":true}", "status_code": 200 })
        );
    }
}
