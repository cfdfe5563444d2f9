//! Order status machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──► Processing ──► Completed
///    │            │
///    └────────────┴──► Cancelled
/// ```
/// `Pending` may also go straight to `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created by checkout, not yet picked up.
    #[default]
    Pending,

    /// Being prepared for shipment.
    Processing,

    /// Shipped and done (terminal).
    Completed,

    /// Cancelled (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if processing can start in this status.
    pub fn can_start_processing(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be completed in this status.
    pub fn can_complete(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if the order can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns true if an order in this status may move to `next`.
    /// Setting the current status again is allowed on non-terminal orders.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match next {
            _ if *self == next => !self.is_terminal(),
            OrderStatus::Pending => false,
            OrderStatus::Processing => self.can_start_processing(),
            OrderStatus::Completed => self.can_complete(),
            OrderStatus::Cancelled => self.can_cancel(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn all() -> [OrderStatus; 4] {
        [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ]
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
