//! Append-only audit store access.
//!
//! Price points, catalog mutations and invoice operations are written to an
//! append-only store partitioned by entity id and clustered by descending
//! timestamp. Rows are never updated or deleted after insert.
//!
//! Callers go through [`ResilientAuditClient`], which wraps every store call
//! in a bounded retry loop and serves price history reads cache-aside from
//! the key-value store.

pub mod analytics;
pub mod cache;
pub mod client;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod retry;
pub mod store;

pub use analytics::{PriceVolatility, price_volatility};
pub use cache::{CacheAside, DEFAULT_CACHE_TTL};
pub use client::{ResilientAuditClient, connect_with_retry};
pub use error::{AuditError, Result};
pub use memory::InMemoryAuditStore;
pub use postgres::{PostgresAuditStore, validate_namespace};
pub use record::{
    ChangeType, InvoiceOperation, InvoiceOperationKind, PriceRecord, ProductChange, TimeWindow,
};
pub use retry::{RetryPolicy, with_retry};
pub use store::AuditStore;
