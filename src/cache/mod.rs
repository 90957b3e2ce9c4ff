//! Pluggable result cache (spec §4.4, C4): LRU, memoize, or Redis-backed.
//!
//! Grounded in `decorators/cache_decorator/lru_caching/lru_caching.py`,
//! `memoize_caching.py`, and `redis_caching.py`.

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::config::RedisConfig;
use crate::constants::DEFAULT_LRU_CAPACITY;
use crate::error::ConfigError;

/// Cache key identity (§3): function identity plus positional and frozen
/// keyword arguments, collapsed into one comparable string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(function: &str, args: &[String], kwargs: &[(String, String)]) -> Self {
        let mut kw = kwargs.to_vec();
        kw.sort();
        Fingerprint(format!("{function}:{args:?}:{kw:?}"))
    }
}

/// Fixed-capacity LRU cache (§4.4): on hit, the key moves to the
/// most-recently-used end; inserting past capacity evicts the least
/// recently used entry.
pub struct LruCache<V> {
    capacity: usize,
    order: Mutex<Vec<Fingerprint>>,
    entries: Mutex<HashMap<Fingerprint, V>>,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: Mutex::new(Vec::new()),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_LRU_CAPACITY)
    }

    pub async fn get(&self, key: &Fingerprint) -> Option<V> {
        let entries = self.entries.lock().await;
        let value = entries.get(key).cloned();
        if value.is_some() {
            drop(entries);
            let mut order = self.order.lock().await;
            if let Some(pos) = order.iter().position(|k| k == key) {
                let k = order.remove(pos);
                order.push(k);
            }
        }
        value
    }

    pub async fn put(&self, key: Fingerprint, value: V) {
        let mut order = self.order.lock().await;
        let mut entries = self.entries.lock().await;

        if entries.contains_key(&key) {
            if let Some(pos) = order.iter().position(|k| k == &key) {
                let k = order.remove(pos);
                order.push(k);
            }
        } else {
            if order.len() >= self.capacity {
                if let Some(oldest) = order.first().cloned() {
                    order.remove(0);
                    entries.remove(&oldest);
                }
            }
            order.push(key.clone());
        }
        entries.insert(key, value);
    }
}

/// Unbounded memoization cache (§4.4): never evicts.
pub struct MemoizeCache<V> {
    entries: Mutex<HashMap<Fingerprint, V>>,
}

impl<V: Clone> MemoizeCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &Fingerprint) -> Option<V> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn put(&self, key: Fingerprint, value: V) {
        self.entries.lock().await.insert(key, value);
    }
}

impl<V: Clone> Default for MemoizeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Redis-backed cache (§4.4): key is `SHA-256("{func}:{args}:{kwargs}")`,
/// value a serialised byte blob, stored with a per-call TTL.
pub struct RedisCache {
    client: Option<redis::Client>,
}

impl RedisCache {
    pub fn new(config: Option<&RedisConfig>) -> Self {
        let client = config.and_then(|c| redis::Client::open(c.url.clone()).ok());
        Self { client }
    }

    pub fn key_for(func_name: &str, args: &str, kwargs: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{func_name}:{args}:{kwargs}").as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        let client = self.client.as_ref().ok_or(ConfigError::NoCacheBackend)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|_| ConfigError::NoCacheBackend)?;
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .unwrap_or(None);
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), ConfigError> {
        let client = self.client.as_ref().ok_or(ConfigError::NoCacheBackend)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|_| ConfigError::NoCacheBackend)?;
        let _: () = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs())
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|_| ConfigError::NoCacheBackend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::new(s, &[], &[])
    }

    #[tokio::test]
    async fn lru_evicts_least_recently_accessed() {
        let cache: LruCache<i32> = LruCache::new(2);
        cache.put(fp("a"), 1).await;
        cache.put(fp("b"), 2).await;
        cache.put(fp("c"), 3).await;

        assert_eq!(cache.get(&fp("a")).await, None);
        assert_eq!(cache.get(&fp("b")).await, Some(2));
        assert_eq!(cache.get(&fp("c")).await, Some(3));
    }

    #[tokio::test]
    async fn lru_get_refreshes_recency() {
        let cache: LruCache<i32> = LruCache::new(2);
        cache.put(fp("a"), 1).await;
        cache.put(fp("b"), 2).await;
        cache.get(&fp("a")).await; // a is now most-recent
        cache.put(fp("c"), 3).await; // evicts b, not a

        assert_eq!(cache.get(&fp("a")).await, Some(1));
        assert_eq!(cache.get(&fp("b")).await, None);
    }

    #[tokio::test]
    async fn memoize_never_evicts() {
        let cache: MemoizeCache<i32> = MemoizeCache::new();
        for i in 0..500 {
            cache.put(fp(&i.to_string()), i).await;
        }
        assert_eq!(cache.get(&fp("0")).await, Some(0));
        assert_eq!(cache.get(&fp("499")).await, Some(499));
    }

    #[tokio::test]
    async fn redis_cache_without_config_fails_closed() {
        let cache = RedisCache::new(None);
        let err = cache.get("k").await.unwrap_err();
        assert!(matches!(err, ConfigError::NoCacheBackend));
    }
}
