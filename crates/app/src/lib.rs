//! Storefront process wiring.
//!
//! Loads configuration, connects the audit store with retries, builds the
//! orchestration services around shared store handles and tears them down
//! again. The binary adds structured logging and a Prometheus exporter.

pub mod config;
pub mod error;
pub mod seed;
pub mod storefront;

pub use config::Config;
pub use error::{AppError, ErrorResponse, Status};
pub use seed::{SeedSummary, seed_demo_data};
pub use storefront::{AuditHandle, Storefront};
