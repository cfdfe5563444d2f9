//! Rows written to the append-only store.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use common::{InvoiceId, Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::AuditError;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Inclusive time range used to scope history queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window ending now and starting `days` ago.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    /// The `days` whole UTC days up to and including today.
    ///
    /// Bounds only move at midnight, so repeated calls within a day yield
    /// the same window.
    pub fn calendar_days(days: i64) -> Self {
        let end = (Utc::now().date_naive() + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc();
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// One recorded price point for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub product_id: ProductId,
    pub timestamp: DateTime<Utc>,
    pub price: Money,
    pub currency: String,
}

impl PriceRecord {
    /// A USD price point stamped now.
    pub fn now(product_id: ProductId, price: Money) -> Self {
        Self::at(product_id, price, Utc::now())
    }

    pub fn at(product_id: ProductId, price: Money, timestamp: DateTime<Utc>) -> Self {
        Self {
            product_id,
            timestamp,
            price,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Kind of catalog mutation recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "CREATE",
            ChangeType::Update => "UPDATE",
            ChangeType::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(ChangeType::Create),
            "UPDATE" => Ok(ChangeType::Update),
            "DELETE" => Ok(ChangeType::Delete),
            other => Err(AuditError::Corrupt(format!("unknown change type {other}"))),
        }
    }
}

/// A catalog mutation with the serialized state before and after.
///
/// An empty string stands for "no state" (before a create, after a delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChange {
    pub product_id: ProductId,
    pub timestamp: DateTime<Utc>,
    pub change_type: ChangeType,
    pub old_value: String,
    pub new_value: String,
}

impl ProductChange {
    pub fn new(
        product_id: ProductId,
        change_type: ChangeType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            product_id,
            timestamp: Utc::now(),
            change_type,
            old_value: old_value.unwrap_or_default(),
            new_value: new_value.unwrap_or_default(),
        }
    }
}

/// Operation performed on an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceOperationKind {
    Create,
    UpdateStatus,
}

impl InvoiceOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceOperationKind::Create => "CREATE",
            InvoiceOperationKind::UpdateStatus => "UPDATE_STATUS",
        }
    }
}

impl std::str::FromStr for InvoiceOperationKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(InvoiceOperationKind::Create),
            "UPDATE_STATUS" => Ok(InvoiceOperationKind::UpdateStatus),
            other => Err(AuditError::Corrupt(format!(
                "unknown invoice operation {other}"
            ))),
        }
    }
}

/// Audit row for an invoice lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceOperation {
    pub invoice_id: InvoiceId,
    pub order_id: OrderId,
    /// The user who performed the operation.
    pub user_id: UserId,
    pub operation: InvoiceOperationKind,
    pub amount: Money,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
