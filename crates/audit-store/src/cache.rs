//! Cache-aside reads backed by the key-value store.

use std::future::Future;
use std::time::Duration;

use kv_store::{KeyValueStore, KeyValueStoreExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// How long cached aggregates live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Cache-aside wrapper around a key-value store.
///
/// Cache failures never fail the read: a broken cache degrades to a
/// straight read-through and is logged.
#[derive(Clone)]
pub struct CacheAside<K: KeyValueStore> {
    kv: K,
    ttl: Duration,
}

impl<K: KeyValueStore> CacheAside<K> {
    pub fn new(kv: K) -> Self {
        Self::with_ttl(kv, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(kv: K, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value for `key`, or loads, caches and returns it.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.kv.get_json::<T>(key).await {
            Ok(Some(hit)) => {
                metrics::counter!("audit_cache_hits_total").increment(1);
                tracing::debug!(key, "cache hit");
                return Ok(hit);
            }
            Ok(None) => {
                metrics::counter!("audit_cache_misses_total").increment(1);
            }
            Err(e) => {
                metrics::counter!("audit_cache_misses_total").increment(1);
                tracing::warn!(key, error = %e, "cache read failed, reading through");
            }
        }

        let value = load().await?;
        self.put(key, &value).await;
        Ok(value)
    }

    /// Stores a value under `key` with the configured TTL.
    pub async fn put<T: Serialize + Sync>(&self, key: &str, value: &T) {
        if let Err(e) = self.kv.set_json(key, value, Some(self.ttl)).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    /// Drops every cached entry whose key starts with `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) {
        match self.kv.delete_prefix(prefix).await {
            Ok(removed) => tracing::debug!(prefix, removed, "cache invalidated"),
            Err(e) => tracing::warn!(prefix, error = %e, "cache invalidation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use kv_store::InMemoryKeyValueStore;

    use super::*;

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = CacheAside::new(InMemoryKeyValueStore::new());
        let loads = AtomicU32::new(0);
        let loads = &loads;

        for _ in 0..3 {
            let value: Result<Vec<u32>, String> = cache
                .get_or_load("k", || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2])
                })
                .await;
            assert_eq!(value.unwrap(), vec![1, 2]);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_errors_are_not_cached() {
        let kv = InMemoryKeyValueStore::new();
        let cache = CacheAside::new(kv.clone());

        let value: Result<u32, String> =
            cache.get_or_load("k", || async { Err("down".to_string()) }).await;
        assert!(value.is_err());
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_broken_cache_reads_through() {
        let kv = InMemoryKeyValueStore::new();
        let cache = CacheAside::new(kv.clone());
        // Fails the cache read and the cache write.
        kv.fail_next(2);

        let value: Result<u32, String> = cache.get_or_load("k", || async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn test_entries_expire_with_ttl() {
        let cache = CacheAside::with_ttl(InMemoryKeyValueStore::new(), Duration::from_millis(20));
        cache.put("k", &1u32).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        let value: Result<u32, String> = cache.get_or_load("k", || async { Ok(2) }).await;
        assert_eq!(value.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_prefix() {
        let kv = InMemoryKeyValueStore::new();
        let cache = CacheAside::new(kv.clone());
        cache.put("price_history:p1:a", &1u32).await;
        cache.put("price_history:p2:a", &1u32).await;

        cache.invalidate_prefix("price_history:p1:").await;
        assert_eq!(kv.len().await, 1);
    }
}
