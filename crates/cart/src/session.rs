//! Session payloads stored with a TTL.

use std::time::Duration;

use common::UserId;
use kv_store::{KeyValueStore, KeyValueStoreExt};
use serde_json::Value;

use crate::Result;

const SESSION_PREFIX: &str = "session:";

/// Stores opaque per-user session data that expires on its own.
///
/// Token issuance happens elsewhere; this only keeps whatever the identity
/// layer wants cached next to the cart.
#[derive(Clone)]
pub struct SessionStore<K: KeyValueStore> {
    kv: K,
    default_ttl: Duration,
}

impl<K: KeyValueStore> SessionStore<K> {
    pub fn new(kv: K, default_ttl: Duration) -> Self {
        Self { kv, default_ttl }
    }

    fn key(user_id: UserId) -> String {
        format!("{SESSION_PREFIX}{user_id}")
    }

    /// Stores session data, expiring after `ttl` or the default TTL.
    pub async fn set(&self, user_id: UserId, data: &Value, ttl: Option<Duration>) -> Result<()> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.kv.set_json(&Self::key(user_id), data, Some(ttl)).await?;
        Ok(())
    }

    pub async fn get(&self, user_id: UserId) -> Result<Option<Value>> {
        Ok(self.kv.get_json(&Self::key(user_id)).await?)
    }

    pub async fn remove(&self, user_id: UserId) -> Result<()> {
        self.kv.delete(&Self::key(user_id)).await?;
        Ok(())
    }
}
