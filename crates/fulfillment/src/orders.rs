//! Order reads and privileged order mutations.

use std::collections::BTreeMap;

use audit_store::TimeWindow;
use common::{Caller, Money, OrderId};
use domain::{Order, OrderFilter, OrderStatus, OrderStore, PaymentStatus};
use serde::Serialize;

use crate::{FulfillmentError, Page, Result};

/// Aggregate order figures over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderAnalytics {
    pub window: TimeWindow,
    pub total_orders: usize,
    /// Sum of non-cancelled order totals.
    pub revenue: Money,
    pub average_order_value: Money,
    pub by_status: BTreeMap<&'static str, usize>,
}

/// Order lookups and status changes.
pub struct OrderDesk<O: OrderStore> {
    orders: O,
}

impl<O: OrderStore> OrderDesk<O> {
    pub fn new(orders: O) -> Self {
        Self { orders }
    }

    async fn load(&self, id: OrderId) -> Result<Order> {
        self.orders
            .find(id)
            .await?
            .ok_or(FulfillmentError::OrderNotFound(id))
    }

    fn require_admin(caller: Caller, action: &str) -> Result<()> {
        if caller.is_admin() {
            Ok(())
        } else {
            Err(FulfillmentError::forbidden(action))
        }
    }

    pub async fn order(&self, caller: Caller, id: OrderId) -> Result<Order> {
        let order = self.load(id).await?;
        if !caller.can_access(order.user_id) {
            return Err(FulfillmentError::forbidden("read this order"));
        }
        Ok(order)
    }

    /// Admins see every order, customers only their own. Newest first.
    pub async fn list_orders(
        &self,
        caller: Caller,
        status: Option<OrderStatus>,
        page: usize,
        limit: usize,
    ) -> Result<Page<Order>> {
        let filter = OrderFilter {
            user_id: (!caller.is_admin()).then_some(caller.user_id),
            status,
        };
        let orders = self.orders.list(filter).await?;
        Ok(Page::slice(orders, page, limit))
    }

    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn update_status(
        &self,
        caller: Caller,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        Self::require_admin(caller, "change order status")?;
        let mut order = self.load(id).await?;
        let from = order.status;
        order.transition(status)?;
        self.orders.save(order.clone()).await?;
        tracing::info!(order_id = %id, %from, to = %status, "order status changed");
        Ok(order)
    }

    #[tracing::instrument(skip(self), fields(user_id = %caller.user_id))]
    pub async fn update_payment_status(
        &self,
        caller: Caller,
        id: OrderId,
        status: PaymentStatus,
    ) -> Result<Order> {
        Self::require_admin(caller, "change payment status")?;
        let mut order = self.load(id).await?;
        order.set_payment_status(status);
        self.orders.save(order.clone()).await?;
        Ok(order)
    }

    pub async fn order_analytics(&self, caller: Caller, window: TimeWindow) -> Result<OrderAnalytics> {
        Self::require_admin(caller, "read order analytics")?;
        let orders: Vec<Order> = self
            .orders
            .list(OrderFilter::default())
            .await?
            .into_iter()
            .filter(|o| window.contains(o.created_at))
            .collect();

        let mut by_status: BTreeMap<&'static str, usize> =
            OrderStatus::all().iter().map(|s| (s.as_str(), 0)).collect();
        for order in &orders {
            *by_status.entry(order.status.as_str()).or_default() += 1;
        }

        let billable: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .collect();
        let revenue: Money = billable.iter().map(|o| o.total()).sum();
        let average_order_value = if billable.is_empty() {
            Money::zero()
        } else {
            Money::from_cents(revenue.cents() / billable.len() as i64)
        };

        Ok(OrderAnalytics {
            window,
            total_orders: orders.len(),
            revenue,
            average_order_value,
            by_status,
        })
    }
}
