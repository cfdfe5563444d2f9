use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::{KeyValueStore, KvError, Result};

#[derive(Debug, Clone)]
enum Value {
    Plain(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    ttl: Option<Duration>,
}

impl Entry {
    fn plain(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value: Value::Plain(value),
            ttl,
        }
    }

    fn list(list: VecDeque<String>) -> Self {
        Self {
            value: Value::List(list),
            ttl: None,
        }
    }
}

/// Each write restarts the entry's clock with its own TTL.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-memory key-value store implementation.
///
/// Mirrors the subset of Redis semantics the storefront relies on: plain
/// values with optional TTL, tail-push lists with trimming, and prefix
/// scans. Entries live in a `moka` cache with per-entry expiry, so expired
/// keys are evicted rather than kept around. Clones share the same cache.
#[derive(Clone)]
pub struct InMemoryKeyValueStore {
    entries: Cache<String, Entry>,
    // Serialises read-modify-write list updates.
    writes: Arc<Mutex<()>>,
    fail_next: Arc<AtomicUsize>,
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self {
            entries: Cache::builder().expire_after(PerEntryTtl).build(),
            writes: Arc::default(),
            fail_next: Arc::default(),
        }
    }
}

impl InMemoryKeyValueStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` operations fail with `Unavailable`.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Returns the number of live keys.
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        self.entries.iter().count()
    }

    /// Returns true if no live keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries still held in memory after pending evictions run.
    pub async fn resident_entries(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    fn check_available(&self) -> Result<()> {
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(KvError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    async fn list(&self, key: &str) -> Result<Option<VecDeque<String>>> {
        match self.entries.get(key).await {
            Some(Entry {
                value: Value::List(list),
                ..
            }) => Ok(Some(list)),
            Some(_) => Err(KvError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        match self.entries.get(key).await {
            Some(Entry {
                value: Value::Plain(v),
                ..
            }) => Ok(Some(v)),
            Some(_) => Err(KvError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        self.check_available()?;
        let _guard = self.writes.lock().await;
        self.entries
            .insert(key.to_string(), Entry::plain(value, ttl))
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_available()?;
        let _guard = self.writes.lock().await;
        Ok(self.entries.remove(key).await.is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.check_available()?;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn list_push(&self, key: &str, value: String) -> Result<usize> {
        self.check_available()?;
        let _guard = self.writes.lock().await;
        let mut list = self.list(key).await?.unwrap_or_default();
        list.push_back(value);
        let len = list.len();
        self.entries.insert(key.to_string(), Entry::list(list)).await;
        Ok(len)
    }

    async fn list_trim_last(&self, key: &str, keep: usize) -> Result<()> {
        self.check_available()?;
        let _guard = self.writes.lock().await;
        let Some(mut list) = self.list(key).await? else {
            return Ok(());
        };
        if list.len() > keep {
            list.drain(..list.len() - keep);
            self.entries.insert(key.to_string(), Entry::list(list)).await;
        }
        Ok(())
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self
            .list(key)
            .await?
            .map(|list| list.into_iter().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyValueStoreExt;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryKeyValueStore::new();
        store.set("a", "1".to_string(), None).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = InMemoryKeyValueStore::new();
        store
            .set("session:1", "x".to_string(), Some(Duration::from_millis(20)))
            .await
            .unwrap();
        assert!(store.get("session:1").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(store.get("session:1").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted() {
        let store = InMemoryKeyValueStore::new();
        for i in 0..200 {
            store
                .set(&format!("volatility:p{i}:"), "x".to_string(), Some(Duration::from_millis(1)))
                .await
                .unwrap();
        }
        store.set("keep", "y".to_string(), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.resident_entries().await, 1);
        assert!(store.keys_with_prefix("volatility:").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_replaces_ttl() {
        let store = InMemoryKeyValueStore::new();
        store
            .set("k", "short".to_string(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        store.set("k", "forever".to_string(), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("forever"));
    }

    #[tokio::test]
    async fn test_list_push_and_trim_keeps_tail() {
        let store = InMemoryKeyValueStore::new();
        for i in 0..5 {
            store.list_push("h", i.to_string()).await.unwrap();
        }
        store.list_trim_last("h", 3).await.unwrap();
        assert_eq!(store.list_range("h").await.unwrap(), vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn test_missing_list_is_empty() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.list_range("nope").await.unwrap().is_empty());
        store.list_trim_last("nope", 3).await.unwrap();
    }

    #[tokio::test]
    async fn test_wrong_type() {
        let store = InMemoryKeyValueStore::new();
        store.set("k", "v".to_string(), None).await.unwrap();
        assert!(matches!(
            store.list_push("k", "x".to_string()).await,
            Err(KvError::WrongType(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_prefix_only_touches_matching_keys() {
        let store = InMemoryKeyValueStore::new();
        store.set("price_history:p1:a", "1".into(), None).await.unwrap();
        store.set("price_history:p1:b", "1".into(), None).await.unwrap();
        store.set("price_history:p10:a", "1".into(), None).await.unwrap();

        let removed = store.delete_prefix("price_history:p1:").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            store.keys_with_prefix("price_history:").await.unwrap(),
            vec!["price_history:p10:a"]
        );
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = InMemoryKeyValueStore::new();
        store.set_json("j", &vec![1, 2, 3], None).await.unwrap();
        let v: Option<Vec<i32>> = store.get_json("j").await.unwrap();
        assert_eq!(v, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let store = InMemoryKeyValueStore::new();
        store.fail_next(1);
        assert!(matches!(store.get("a").await, Err(KvError::Unavailable(_))));
        assert!(store.get("a").await.unwrap().is_none());
    }
}
