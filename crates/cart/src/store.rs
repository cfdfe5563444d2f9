//! Cart store over the key-value collaborator.

use chrono::Utc;
use common::{ProductId, UserId};
use kv_store::{KeyValueStore, KeyValueStoreExt};

use crate::error::CartError;
use crate::model::{Cart, CartItem, CartSnapshot};
use crate::Result;

const CART_PREFIX: &str = "cart:";
const CART_HISTORY_PREFIX: &str = "cart_history:";

/// Number of snapshots kept per user.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Live carts and their bounded snapshot history.
#[derive(Clone)]
pub struct CartStore<K: KeyValueStore> {
    kv: K,
    history_limit: usize,
}

impl<K: KeyValueStore> CartStore<K> {
    /// Creates a cart store keeping the default number of snapshots.
    pub fn new(kv: K) -> Self {
        Self::with_history_limit(kv, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(kv: K, history_limit: usize) -> Self {
        Self {
            kv,
            history_limit: history_limit.max(1),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    fn cart_key(user_id: UserId) -> String {
        format!("{CART_PREFIX}{user_id}")
    }

    fn history_key(user_id: UserId) -> String {
        format!("{CART_HISTORY_PREFIX}{user_id}")
    }

    /// Loads the live cart.
    pub async fn get(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.kv.get_json(&Self::cart_key(user_id)).await?)
    }

    /// Adds an item, creating the cart on first add.
    #[tracing::instrument(skip(self, item), fields(product_id = %item.product_id))]
    pub async fn add(&self, user_id: UserId, item: CartItem) -> Result<Cart> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                product_id: item.product_id,
            });
        }

        let mut cart = self
            .get(user_id)
            .await?
            .unwrap_or_else(|| Cart::empty(user_id));
        cart.add_item(item)?;

        self.write(&cart).await?;
        Ok(cart)
    }

    /// Removes a product from the cart. Returns `None` if no cart exists.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, product_id: &ProductId) -> Result<Option<Cart>> {
        let Some(mut cart) = self.get(user_id).await? else {
            return Ok(None);
        };
        cart.remove_item(product_id);

        self.write(&cart).await?;
        Ok(Some(cart))
    }

    /// Deletes the live cart. History is left to age out on its own.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<()> {
        self.kv.delete(&Self::cart_key(user_id)).await?;
        Ok(())
    }

    /// Returns the snapshot history, oldest first.
    pub async fn history(&self, user_id: UserId) -> Result<Vec<CartSnapshot>> {
        let raw = self.kv.list_range(&Self::history_key(user_id)).await?;
        raw.iter()
            .map(|entry| serde_json::from_str(entry).map_err(CartError::from))
            .collect()
    }

    /// Re-installs a historical snapshot as the live cart.
    ///
    /// The revert is itself a mutation and is snapshotted like any other.
    #[tracing::instrument(skip(self))]
    pub async fn revert_to(&self, user_id: UserId, index: usize) -> Result<Cart> {
        let mut history = self.history(user_id).await?;
        let available = history.len();
        if index >= available {
            return Err(CartError::SnapshotNotFound { index, available });
        }

        let mut cart = history.swap_remove(index).cart;
        cart.touch();

        self.write(&cart).await?;
        tracing::info!(%user_id, index, "cart reverted to snapshot");
        Ok(cart)
    }

    /// Writes the live cart and pushes a snapshot, trimming history.
    async fn write(&self, cart: &Cart) -> Result<()> {
        let user_id = cart.user_id();
        self.kv.set_json(&Self::cart_key(user_id), cart, None).await?;

        let snapshot = CartSnapshot {
            cart: cart.clone(),
            captured_at: Utc::now(),
        };
        let history_key = Self::history_key(user_id);
        self.kv
            .list_push(&history_key, serde_json::to_string(&snapshot)?)
            .await?;
        self.kv
            .list_trim_last(&history_key, self.history_limit)
            .await?;
        Ok(())
    }
}
