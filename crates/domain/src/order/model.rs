use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{DomainError, OrderStatus, Result};

/// A purchased line. The price is copied at checkout and never re-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    DebitCard,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub status: PaymentStatus,
}

impl PaymentInfo {
    pub fn new(method: PaymentMethod, transaction_id: impl Into<String>) -> Self {
        Self {
            method,
            transaction_id: transaction_id.into(),
            status: PaymentStatus::Pending,
        }
    }
}

/// Shipping or billing address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// An order placed through checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderLine>,
    total: Money,
    pub status: OrderStatus,
    pub payment: PaymentInfo,
    pub shipping_address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a pending order. The total is fixed here from the line prices.
    pub fn new(
        user_id: UserId,
        items: Vec<OrderLine>,
        payment: PaymentInfo,
        shipping_address: Address,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            user_id,
            total: items.iter().map(OrderLine::line_total).sum(),
            items,
            status: OrderStatus::Pending,
            payment,
            shipping_address,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    /// Moves the order to `next`, refusing transitions out of terminal statuses.
    pub fn transition(&mut self, next: OrderStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order::new(
            UserId::new(),
            vec![
                OrderLine::new(ProductId::new("p1"), "Lamp", 2, Money::from_cents(1250)),
                OrderLine::new(ProductId::new("p2"), "Desk", 1, Money::from_cents(9900)),
            ],
            PaymentInfo::new(PaymentMethod::CreditCard, "tx-1"),
            Address::default(),
        )
    }

    #[test]
    fn test_total_fixed_at_creation() {
        let mut order = order();
        assert_eq!(order.total(), Money::from_cents(12400));
        assert_eq!(order.item_count(), 3);

        order.items[0].unit_price = Money::from_cents(1);
        assert_eq!(order.total(), Money::from_cents(12400));
    }

    #[test]
    fn test_transition_rules() {
        let mut order = order();
        order.transition(OrderStatus::Processing).unwrap();
        order.transition(OrderStatus::Completed).unwrap();

        let err = order.transition(OrderStatus::Cancelled).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled
            }
        ));
    }

    #[test]
    fn test_payment_status_update() {
        let mut order = order();
        order.set_payment_status(PaymentStatus::Completed);
        assert_eq!(order.payment.status, PaymentStatus::Completed);
    }
}
