//! Error types for process startup and status mapping for callers.

use audit_store::AuditError;
use common::{Caller, ErrorKind};
use fulfillment::FulfillmentError;
use serde::Serialize;
use thiserror::Error;

/// Errors that stop the process from starting.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Audit store setup failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Metrics exporter setup failed: {0}")]
    Metrics(String),

    #[error("Demo data seeding failed: {0}")]
    Seed(#[from] FulfillmentError),
}

/// Coarse outcome class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ServiceUnavailable,
    Internal,
}

impl Status {
    /// HTTP-equivalent status code.
    pub fn code(&self) -> u16 {
        match self {
            Status::BadRequest => 400,
            Status::Unauthorized => 401,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::Conflict => 409,
            Status::ServiceUnavailable => 503,
            Status::Internal => 500,
        }
    }
}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => Status::BadRequest,
            ErrorKind::Unauthorized => Status::Unauthorized,
            ErrorKind::Forbidden => Status::Forbidden,
            ErrorKind::NotFound => Status::NotFound,
            ErrorKind::Conflict | ErrorKind::InsufficientStock => Status::Conflict,
            ErrorKind::UpstreamUnavailable => Status::ServiceUnavailable,
            ErrorKind::Internal => Status::Internal,
        }
    }
}

/// What a caller sees when an operation fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub kind: &'static str,
    pub error: String,
}

impl ErrorResponse {
    /// Maps an error to its public form.
    ///
    /// Internal and upstream details are logged and replaced with a generic
    /// message unless the caller is an admin.
    pub fn for_caller(err: &FulfillmentError, caller: Caller) -> Self {
        let kind = err.kind();
        let status = Status::from(kind);
        let error = match status {
            Status::Internal | Status::ServiceUnavailable => {
                tracing::error!(error = %err, kind = %kind, "operation failed");
                if caller.is_admin() {
                    err.to_string()
                } else if status == Status::Internal {
                    "Internal error".to_string()
                } else {
                    "Service temporarily unavailable".to_string()
                }
            }
            _ => err.to_string(),
        };

        Self {
            status,
            kind: kind.as_str(),
            error,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.error, "kind": self.kind, "status": self.status.code() })
    }
}
