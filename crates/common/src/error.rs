//! Coarse error classification shared by every crate.

/// The category a failure falls into, independent of which store raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Product, order, invoice or cart state is absent.
    NotFound,
    /// Duplicate invoice for an order, duplicate SKU.
    Conflict,
    /// Requested quantity exceeds available stock.
    InsufficientStock,
    Unauthorized,
    /// Ownership or role check failed.
    Forbidden,
    /// A backing store failed after exhausting retries.
    UpstreamUnavailable,
    /// Malformed input.
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
