//! Checkout saga: turns a cart into an order.

use std::time::Instant;

use cart::CartStore;
use common::Caller;
use domain::{Address, CatalogStore, DomainError, Order, OrderLine, OrderStore, PaymentInfo};
use graph::{GraphService, InteractionGraph, Segment};
use kv_store::KeyValueStore;
use serde::{Deserialize, Serialize};

use crate::steps::{
    STEP_CLEAR_CART, STEP_PERSIST_ORDER, STEP_RECORD_GRAPH, STEP_REFRESH_SEGMENT,
    STEP_RESERVE_STOCK,
};
use crate::{CheckoutProgress, FulfillmentError, Result};

/// Payment and shipping details supplied with a checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub payment: PaymentInfo,
    pub shipping_address: Address,
}

/// Result of a completed checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub progress: CheckoutProgress,
    /// The refreshed segment, absent if the refresh failed.
    pub segment: Option<Segment>,
}

/// Orchestrates checkout across the catalog, order store, cart store and
/// interaction graph.
///
/// Steps run in a fixed order:
/// 1. reserve stock, one line at a time
/// 2. persist the order
/// 3. record the order in the graph (secondary)
/// 4. clear the cart
/// 5. refresh the user's segment (secondary)
///
/// Nothing is compensated. Stock taken for earlier lines stays taken when a
/// later line or a later step fails. Secondary step failures are logged and
/// listed in [`CheckoutProgress::degraded_steps`].
pub struct CheckoutCoordinator<C, O, K, G>
where
    C: CatalogStore,
    O: OrderStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    catalog: C,
    orders: O,
    carts: CartStore<K>,
    graph: GraphService<G>,
}

impl<C, O, K, G> CheckoutCoordinator<C, O, K, G>
where
    C: CatalogStore,
    O: OrderStore,
    K: KeyValueStore,
    G: InteractionGraph + Clone,
{
    pub fn new(catalog: C, orders: O, carts: CartStore<K>, graph: GraphService<G>) -> Self {
        Self {
            catalog,
            orders,
            carts,
            graph,
        }
    }

    /// Checks out the caller's cart.
    #[tracing::instrument(skip(self, request), fields(user_id = %caller.user_id))]
    pub async fn checkout(&self, caller: Caller, request: CheckoutRequest) -> Result<CheckoutOutcome> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = Instant::now();
        let mut progress = CheckoutProgress::default();
        progress.start();

        let result = self.run(caller, request, &mut progress).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match result {
            Ok((order, segment)) => {
                progress.finish();
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    total = %order.total(),
                    degraded = ?progress.degraded_steps,
                    "checkout completed"
                );
                Ok(CheckoutOutcome {
                    order,
                    progress,
                    segment,
                })
            }
            Err(e) => {
                progress.fail();
                metrics::counter!("checkout_failed_total", "reason" => e.reason()).increment(1);
                tracing::warn!(
                    error = %e,
                    completed = ?progress.completed_steps,
                    "checkout failed"
                );
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        caller: Caller,
        request: CheckoutRequest,
        progress: &mut CheckoutProgress,
    ) -> Result<(Order, Option<Segment>)> {
        let user_id = caller.user_id;
        let cart = match self.carts.get(user_id).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(FulfillmentError::EmptyCart),
        };

        // 1. Reserve stock line by line
        tracing::info!(step = STEP_RESERVE_STOCK, lines = cart.items().len(), "checkout step started");
        let mut lines = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            self.catalog
                .decrement_stock(&item.product_id, item.quantity)
                .await
                .map_err(|e| match e {
                    DomainError::ProductNotFound(id) => FulfillmentError::ProductNotFound(id),
                    DomainError::InsufficientStock {
                        product_id,
                        name,
                        requested,
                        available,
                    } => FulfillmentError::InsufficientStock {
                        product_id,
                        name,
                        requested,
                        available,
                    },
                    other => FulfillmentError::StepFailed {
                        step: STEP_RESERVE_STOCK,
                        reason: other.to_string(),
                    },
                })?;
            lines.push(OrderLine::new(
                item.product_id.clone(),
                item.name.clone(),
                item.quantity,
                item.unit_price,
            ));
        }
        progress.completed(STEP_RESERVE_STOCK);

        // 2. Persist the order with the cart's prices
        tracing::info!(step = STEP_PERSIST_ORDER, "checkout step started");
        let order = Order::new(user_id, lines, request.payment, request.shipping_address);
        self.orders
            .save(order.clone())
            .await
            .map_err(|e| FulfillmentError::StepFailed {
                step: STEP_PERSIST_ORDER,
                reason: e.to_string(),
            })?;
        progress.completed(STEP_PERSIST_ORDER);

        // 3. Graph edge; the order stands even if this fails
        match self.graph.record_order(user_id, order.id, order.total()).await {
            Ok(()) => progress.completed(STEP_RECORD_GRAPH),
            Err(e) => {
                tracing::warn!(step = STEP_RECORD_GRAPH, order_id = %order.id, error = %e, "secondary step failed");
                progress.degraded(STEP_RECORD_GRAPH);
            }
        }

        // 4. Clear the cart
        self.carts
            .clear(user_id)
            .await
            .map_err(|e| FulfillmentError::StepFailed {
                step: STEP_CLEAR_CART,
                reason: e.to_string(),
            })?;
        progress.completed(STEP_CLEAR_CART);

        // 5. Segment refresh
        let segment = match self.graph.refresh_segment(user_id).await {
            Ok(segment) => {
                progress.completed(STEP_REFRESH_SEGMENT);
                Some(segment)
            }
            Err(e) => {
                tracing::warn!(step = STEP_REFRESH_SEGMENT, error = %e, "secondary step failed");
                progress.degraded(STEP_REFRESH_SEGMENT);
                None
            }
        };

        Ok((order, segment))
    }
}
