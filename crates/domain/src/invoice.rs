//! Invoices derived from orders.

use chrono::{DateTime, Datelike, Utc};
use common::{InvoiceId, Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::{Address, Order, PaymentMethod};

/// Flat tax applied to every invoice subtotal.
pub const TAX_RATE_PERCENT: u32 = 21;

/// Human-readable sequential invoice number, `INV-YYYYMM-NNNNNN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Number for the `sequence`-th invoice, stamped with the month of `at`.
    pub fn sequential(at: DateTime<Utc>, sequence: u64) -> Self {
        Self(format!(
            "INV-{:04}{:02}-{:06}",
            at.year(),
            at.month(),
            sequence
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// An invoice for exactly one order.
///
/// Amounts are computed once from the order lines when the invoice is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: InvoiceNumber,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<InvoiceLine>,
    subtotal: Money,
    tax: Money,
    total: Money,
    pub status: InvoiceStatus,
    pub payment_method: PaymentMethod,
    pub transaction_id: String,
    pub payment_date: Option<DateTime<Utc>>,
    pub billing_address: Address,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Builds a pending invoice from an order's lines and payment details.
    pub fn for_order(order: &Order, number: InvoiceNumber) -> Self {
        let lines: Vec<InvoiceLine> = order
            .items
            .iter()
            .map(|line| InvoiceLine {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.line_total(),
            })
            .collect();
        let subtotal: Money = lines.iter().map(|l| l.subtotal).sum();
        let tax = subtotal.percentage(TAX_RATE_PERCENT);
        let now = Utc::now();

        Self {
            id: InvoiceId::new(),
            number,
            order_id: order.id,
            user_id: order.user_id,
            lines,
            subtotal,
            tax,
            total: subtotal + tax,
            status: InvoiceStatus::Pending,
            payment_method: order.payment.method,
            transaction_id: order.payment.transaction_id.clone(),
            payment_date: None,
            billing_address: order.shipping_address.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Sets the status. Marking an invoice paid stamps the payment date.
    pub fn set_status(&mut self, status: InvoiceStatus) {
        let now = Utc::now();
        if status == InvoiceStatus::Paid {
            self.payment_date = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{OrderLine, PaymentInfo};

    fn order() -> Order {
        Order::new(
            UserId::new(),
            vec![
                OrderLine::new(ProductId::new("p1"), "Lamp", 2, Money::from_cents(2500)),
                OrderLine::new(ProductId::new("p2"), "Bulb", 3, Money::from_cents(333)),
            ],
            PaymentInfo::new(PaymentMethod::Transfer, "tx-9"),
            Address::default(),
        )
    }

    #[test]
    fn test_number_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(
            InvoiceNumber::sequential(at, 42).as_str(),
            "INV-202403-000042"
        );
    }

    #[test]
    fn test_amounts_from_order() {
        let order = order();
        let invoice = Invoice::for_order(&order, InvoiceNumber::sequential(Utc::now(), 1));

        // 50.00 + 9.99 = 59.99, 21% = 12.5979 -> 12.60
        assert_eq!(invoice.subtotal(), Money::from_cents(5999));
        assert_eq!(invoice.tax(), Money::from_cents(1260));
        assert_eq!(invoice.total(), Money::from_cents(7259));
        assert_eq!(invoice.lines[1].subtotal, Money::from_cents(999));
        assert_eq!(invoice.payment_method, PaymentMethod::Transfer);
        assert_eq!(invoice.order_id, order.id);
    }

    #[test]
    fn test_paid_stamps_payment_date() {
        let mut invoice = Invoice::for_order(&order(), InvoiceNumber::sequential(Utc::now(), 1));
        assert!(invoice.payment_date.is_none());

        invoice.set_status(InvoiceStatus::Paid);

        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.payment_date.is_some());
    }
}
