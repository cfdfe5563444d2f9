use common::ErrorKind;
use thiserror::Error;

/// Errors that can occur when talking to the graph store.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph store could not be reached.
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::Unavailable(_) => ErrorKind::UpstreamUnavailable,
        }
    }
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;
