use common::{ErrorKind, Money};
use thiserror::Error;

/// Errors that can occur when interacting with the audit store.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store could not be reached.
    #[error("Audit store unavailable: {0}")]
    Unavailable(String),

    /// The configured namespace does not exist (yet).
    #[error("Namespace {0} is not available")]
    NamespaceNotReady(String),

    /// Namespace names are interpolated into DDL and must be plain identifiers.
    #[error("Invalid namespace name: {0}")]
    InvalidNamespace(String),

    /// Prices cannot be negative.
    #[error("Invalid price {0}: must not be negative")]
    InvalidPrice(Money),

    /// A stored row could not be decoded.
    #[error("Corrupt audit row: {0}")]
    Corrupt(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuditError::Database(_)
            | AuditError::Unavailable(_)
            | AuditError::NamespaceNotReady(_) => ErrorKind::UpstreamUnavailable,
            AuditError::InvalidNamespace(_) | AuditError::InvalidPrice(_) => ErrorKind::Validation,
            AuditError::Corrupt(_) | AuditError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for audit store operations.
pub type Result<T> = std::result::Result<T, AuditError>;
