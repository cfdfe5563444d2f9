//! Document-store records for the storefront.
//!
//! This crate provides:
//! - `Product`, `Order` and `Invoice` records with their status machines
//! - Collaborator traits for the document store (`CatalogStore`,
//!   `OrderStore`, `InvoiceStore`)
//! - In-memory implementations of those collaborators

pub mod error;
pub mod invoice;
pub mod memory;
pub mod order;
pub mod product;
pub mod store;

pub use error::{DomainError, Result};
pub use invoice::{Invoice, InvoiceLine, InvoiceNumber, InvoiceStatus, TAX_RATE_PERCENT};
pub use memory::{InMemoryCatalogStore, InMemoryInvoiceStore, InMemoryOrderStore};
pub use order::{
    Address, Order, OrderLine, OrderStatus, PaymentInfo, PaymentMethod, PaymentStatus,
};
pub use product::{Product, ProductUpdate};
pub use store::{CatalogStore, InvoiceStore, OrderFilter, OrderStore};
