//! Domain error types.

use common::{ErrorKind, InvoiceId, OrderId, ProductId};
use thiserror::Error;

use crate::OrderStatus;

/// Errors that can occur during document-store operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Invoice {0} not found")]
    InvoiceNotFound(InvoiceId),

    /// Another product already uses this SKU.
    #[error("A product with SKU {0} already exists")]
    DuplicateSku(String),

    /// The product does not have enough units left.
    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// An invoice already exists for this order.
    #[error("Invoice already exists for order {0}")]
    InvoiceExists(OrderId),

    #[error("Invoice number {0} is already taken")]
    DuplicateInvoiceNumber(String),

    /// Terminal orders cannot change status.
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The document store could not be reached.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::ProductNotFound(_)
            | DomainError::OrderNotFound(_)
            | DomainError::InvoiceNotFound(_) => ErrorKind::NotFound,
            DomainError::DuplicateSku(_)
            | DomainError::InvoiceExists(_)
            | DomainError::DuplicateInvoiceNumber(_)
            | DomainError::InvalidTransition { .. } => ErrorKind::Conflict,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
