use common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when talking to the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    /// The store could not be reached or rejected the command.
    #[error("Key-value store unavailable: {0}")]
    Unavailable(String),

    /// A list command hit a plain value or vice versa.
    #[error("Wrong value type stored at key {0}")]
    WrongType(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KvError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
            KvError::WrongType(_) | KvError::Serialization(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for key-value operations.
pub type Result<T> = std::result::Result<T, KvError>;
