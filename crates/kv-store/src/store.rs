use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

/// Core trait for key-value store implementations.
///
/// Values are opaque strings; callers serialize. Lists are append-at-tail
/// sequences used for bounded histories.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a plain value. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a plain value, replacing whatever was stored under `key`.
    ///
    /// With `ttl`, the key expires after the given duration.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()>;

    /// Deletes a key of any type. Returns true if it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Returns all live keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Appends to the tail of a list, creating it if needed.
    ///
    /// Returns the new list length.
    async fn list_push(&self, key: &str, value: String) -> Result<usize>;

    /// Keeps only the last `keep` entries of a list.
    async fn list_trim_last(&self, key: &str, keep: usize) -> Result<()>;

    /// Returns the whole list, head first. A missing key is an empty list.
    async fn list_range(&self, key: &str) -> Result<Vec<String>>;
}

/// Extension trait providing JSON helpers and bulk operations.
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Reads and deserializes a JSON value.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serializes and writes a JSON value.
    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl).await
    }

    /// Deletes every key starting with `prefix`. Returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let keys = self.keys_with_prefix(prefix).await?;
        let mut removed = 0;
        for key in keys {
            if self.delete(&key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}
