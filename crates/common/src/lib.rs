//! Shared types used across the storefront crates.
//!
//! Identifiers, money amounts, the authenticated caller handed in by the
//! identity collaborator, and the coarse error taxonomy every crate maps
//! its errors onto.

pub mod error;
pub mod identity;
pub mod ids;
pub mod money;

pub use error::ErrorKind;
pub use identity::{Caller, Role};
pub use ids::{InvoiceId, OrderId, ProductId, UserId};
pub use money::Money;
