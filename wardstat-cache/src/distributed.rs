//! Distributed tier adapters.
//!
//! [`RedisStore`] is the production adapter: a client of an existing Redis
//! deployment, with all keys namespaced so the cache shares the store
//! politely. [`InMemoryStore`] implements the same contract without a
//! network, for tests and single-process deployments.
//!
//! Neither adapter swallows errors - failing open is the manager's call.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use wardstat_core::{CacheConfig, CacheError, CacheResult};

use crate::traits::DistributedStore;

/// Escape characters Redis `MATCH` patterns treat as glob syntax, so a
/// literal prefix only ever matches itself.
fn escape_match_pattern(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '^') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// REDIS ADAPTER
// ============================================================================

/// Redis-backed distributed tier.
///
/// Values are stored as JSON strings under `<namespace>:<key>` with
/// per-key expiry. Prefix deletion walks the keyspace with cursor
/// iteration (`SCAN MATCH`) and deletes in batches, never `KEYS`.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    /// Connect to Redis at `url`, namespacing all keys under `namespace`.
    pub async fn connect(url: &str, namespace: impl Into<String>) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(CacheError::backend)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(CacheError::backend)?;
        Ok(Self {
            manager,
            namespace: namespace.into(),
        })
    }

    /// Connect using the URL and namespace from `config`.
    pub async fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        Self::connect(&config.redis_url, config.namespace.clone()).await
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn match_pattern(&self, prefix: &str) -> String {
        format!(
            "{}:{}*",
            escape_match_pattern(&self.namespace),
            escape_match_pattern(prefix)
        )
    }

    async fn scan_keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut keys = Vec::new();
        let mut iter: redis::AsyncIter<'_, String> = conn
            .scan_match(pattern)
            .await
            .map_err(CacheError::backend)?;
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn delete_keys(&self, keys: Vec<String>) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        let mut removed = 0u64;
        for chunk in keys.chunks(512) {
            let n: u64 = conn
                .del(chunk.to_vec())
                .await
                .map_err(CacheError::backend)?;
            removed += n;
        }
        Ok(removed)
    }
}

#[async_trait]
impl DistributedStore for RedisStore {
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            // A zero TTL means "already expired"; Redis rejects EX 0.
            self.delete(key).await?;
            return Ok(());
        }
        let payload =
            serde_json::to_string(value).map_err(|e| CacheError::serialization(key, e))?;
        // Redis expiry has whole-second resolution; round sub-second TTLs up.
        let secs = ttl.as_secs().max(1);
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(self.namespaced(key), payload, secs)
            .await
            .map_err(CacheError::backend)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let mut conn = self.manager.clone();
        let payload: Option<String> = conn
            .get(self.namespaced(key))
            .await
            .map_err(CacheError::backend)?;
        match payload {
            Some(json) => {
                let value =
                    serde_json::from_str(&json).map_err(|e| CacheError::serialization(key, e))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.manager.clone();
        conn.exists(self.namespaced(key))
            .await
            .map_err(CacheError::backend)
    }

    async fn delete(&self, key: &str) -> CacheResult<u64> {
        let mut conn = self.manager.clone();
        conn.del(self.namespaced(key))
            .await
            .map_err(CacheError::backend)
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let keys = self.scan_keys(&self.match_pattern(prefix)).await?;
        self.delete_keys(keys).await
    }

    async fn clear(&self) -> CacheResult<u64> {
        self.delete_by_prefix("").await
    }

    async fn len(&self) -> CacheResult<u64> {
        let keys = self.scan_keys(&self.match_pattern("")).await?;
        Ok(keys.len() as u64)
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        Ok(())
    }
}

// ============================================================================
// IN-MEMORY ADAPTER
// ============================================================================

/// In-memory implementation of the distributed contract.
///
/// Backs tests and single-process deployments where a shared store adds
/// nothing. Expiry uses the monotonic clock and is checked lazily on read,
/// matching the Redis adapter's observable behavior.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, (Value, Option<Instant>)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_expired(deadline: &Option<Instant>) -> bool {
        deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }
}

#[async_trait]
impl DistributedStore for InMemoryStore {
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if ttl.is_zero() {
            entries.remove(key);
            return Ok(());
        }
        let deadline = Instant::now().checked_add(ttl);
        entries.insert(key.to_string(), (value.clone(), deadline));
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some((_, deadline)) if Self::is_expired(deadline) => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(key)
            .map(|(_, deadline)| !Self::is_expired(deadline))
            .unwrap_or(false))
    }

    async fn delete(&self, key: &str) -> CacheResult<u64> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(key).map(|_| 1).unwrap_or(0))
    }

    async fn delete_by_prefix(&self, prefix: &str) -> CacheResult<u64> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> CacheResult<u64> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn len(&self) -> CacheResult<u64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.len() as u64)
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_match_pattern() {
        assert_eq!(escape_match_pattern("ward_statistics:7"), "ward_statistics:7");
        assert_eq!(escape_match_pattern("a*b?c[d]"), "a\\*b\\?c\\[d\\]");
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemoryStore::new();
        store
            .set("k", &json!({"pop": 5}), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"pop": 5})));
        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_zero_ttl_deletes() {
        let store = InMemoryStore::new();
        store.set("k", &json!(1), Duration::from_secs(60)).await.unwrap();
        store.set("k", &json!(1), Duration::ZERO).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_prefix_delete() {
        let store = InMemoryStore::new();
        store.set("a:1", &json!(1), Duration::from_secs(60)).await.unwrap();
        store.set("a:2", &json!(2), Duration::from_secs(60)).await.unwrap();
        store.set("b:1", &json!(3), Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.delete_by_prefix("a:").await.unwrap(), 2);
        assert_eq!(store.get("a:1").await.unwrap(), None);
        assert_eq!(store.get("b:1").await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_in_memory_expiry() {
        let store = InMemoryStore::new();
        store
            .set("k", &json!(1), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }
}
