//! Fulfillment error types.

use audit_store::AuditError;
use cart::CartError;
use common::{ErrorKind, InvoiceId, OrderId, ProductId, UserId};
use domain::DomainError;
use graph::GraphError;
use thiserror::Error;

/// Errors that can occur while orchestrating storefront operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Checkout was requested with no cart or an empty one.
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// Not enough stock for the named product.
    #[error("Insufficient stock for product {name}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(InvoiceId),

    #[error("No cart found for user {0}")]
    CartNotFound(UserId),

    /// The order already has an invoice.
    #[error("Invoice already exists for order {0}")]
    InvoiceExists(OrderId),

    /// The caller may not perform this operation.
    #[error("Not authorized: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// A step after stock reservation failed. Reserved stock is not returned.
    #[error("Fulfillment step '{step}' failed: {reason}")]
    StepFailed { step: &'static str, reason: String },

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),
}

impl FulfillmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FulfillmentError::EmptyCart | FulfillmentError::Validation(_) => ErrorKind::Validation,
            FulfillmentError::ProductNotFound(_)
            | FulfillmentError::OrderNotFound(_)
            | FulfillmentError::InvoiceNotFound(_)
            | FulfillmentError::CartNotFound(_) => ErrorKind::NotFound,
            FulfillmentError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            FulfillmentError::InvoiceExists(_) => ErrorKind::Conflict,
            FulfillmentError::Forbidden(_) => ErrorKind::Forbidden,
            FulfillmentError::StepFailed { .. } => ErrorKind::Internal,
            FulfillmentError::Cart(e) => e.kind(),
            FulfillmentError::Domain(e) => e.kind(),
            FulfillmentError::Graph(e) => e.kind(),
            FulfillmentError::Audit(e) => e.kind(),
        }
    }

    /// Short label used as the `reason` metric tag.
    pub fn reason(&self) -> &'static str {
        match self {
            FulfillmentError::EmptyCart => "empty_cart",
            FulfillmentError::ProductNotFound(_) => "product_not_found",
            FulfillmentError::InsufficientStock { .. } => "insufficient_stock",
            FulfillmentError::StepFailed { step, .. } => *step,
            _ => self.kind().as_str(),
        }
    }

    pub(crate) fn forbidden(action: &str) -> Self {
        FulfillmentError::Forbidden(format!("caller may not {action}"))
    }
}

/// Convenience type alias for fulfillment results.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
