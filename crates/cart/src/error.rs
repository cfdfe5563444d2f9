use common::{ErrorKind, ProductId};
use kv_store::KvError;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The key-value store failed.
    #[error("Cart storage error: {0}")]
    Storage(#[from] KvError),

    /// Quantity must be at least one and the merged line must not overflow.
    #[error("Invalid quantity for product {product_id}")]
    InvalidQuantity { product_id: ProductId },

    /// Revert target does not exist in the history.
    #[error("Cart state {index} not found ({available} states recorded)")]
    SnapshotNotFound { index: usize, available: usize },

    /// A stored cart could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartError::Storage(e) => e.kind(),
            CartError::InvalidQuantity { .. } => ErrorKind::Validation,
            CartError::SnapshotNotFound { .. } => ErrorKind::NotFound,
            CartError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
