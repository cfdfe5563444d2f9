//! Cart operations that consult the catalog and feed the interaction graph.

use cart::{Cart, CartItem, CartSnapshot, CartStore};
use common::{Caller, ProductId};
use domain::CatalogStore;
use graph::{GraphService, InteractionAction, InteractionGraph};
use kv_store::KeyValueStore;

use crate::{FulfillmentError, Result};

/// Cart front door: validates against the catalog, then records the
/// interaction in the graph.
pub struct CartCoordinator<C, K, G>
where
    C: CatalogStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    catalog: C,
    carts: CartStore<K>,
    graph: GraphService<G>,
}

impl<C, K, G> CartCoordinator<C, K, G>
where
    C: CatalogStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    pub fn new(catalog: C, carts: CartStore<K>, graph: GraphService<G>) -> Self {
        Self {
            catalog,
            carts,
            graph,
        }
    }

    /// Adds `quantity` units at the current catalog price.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn add_to_cart(
        &self,
        caller: Caller,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(FulfillmentError::Validation(
                "quantity must be greater than 0".to_string(),
            ));
        }
        let product = self
            .catalog
            .get(product_id)
            .await?
            .ok_or_else(|| FulfillmentError::ProductNotFound(product_id.clone()))?;
        if product.stock < quantity {
            return Err(FulfillmentError::InsufficientStock {
                product_id: product.id,
                name: product.name,
                requested: quantity,
                available: product.stock,
            });
        }

        let cart = self
            .carts
            .add(
                caller.user_id,
                CartItem::new(product.id.clone(), quantity, product.price, product.name.clone()),
            )
            .await?;

        self.record(caller, product_id, InteractionAction::AddToCart, Some(&product.name))
            .await;
        Ok(cart)
    }

    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn remove_from_cart(&self, caller: Caller, product_id: &ProductId) -> Result<Cart> {
        let cart = self
            .carts
            .remove(caller.user_id, product_id)
            .await?
            .ok_or(FulfillmentError::CartNotFound(caller.user_id))?;

        self.record(caller, product_id, InteractionAction::RemoveFromCart, None)
            .await;
        Ok(cart)
    }

    /// The caller's cart, or an empty one if none exists.
    pub async fn view_cart(&self, caller: Caller) -> Result<Cart> {
        Ok(self
            .carts
            .get(caller.user_id)
            .await?
            .unwrap_or_else(|| Cart::empty(caller.user_id)))
    }

    pub async fn clear_cart(&self, caller: Caller) -> Result<()> {
        Ok(self.carts.clear(caller.user_id).await?)
    }

    pub async fn history(&self, caller: Caller) -> Result<Vec<CartSnapshot>> {
        Ok(self.carts.history(caller.user_id).await?)
    }

    /// Re-installs a historical snapshot as the live cart.
    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn revert(&self, caller: Caller, index: usize) -> Result<Cart> {
        Ok(self.carts.revert_to(caller.user_id, index).await?)
    }

    async fn record(
        &self,
        caller: Caller,
        product_id: &ProductId,
        action: InteractionAction,
        name: Option<&str>,
    ) {
        if let Err(e) = self
            .graph
            .record_interaction(caller.user_id, product_id, action, name)
            .await
        {
            tracing::warn!(%action, %product_id, error = %e, "failed to record cart interaction");
        }
    }
}
