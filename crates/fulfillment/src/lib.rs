//! Storefront orchestration.
//!
//! Coordinates the catalog, order and invoice stores with the cart store,
//! the interaction graph and the audit store. The checkout saga runs its
//! steps in a fixed order without compensation; secondary bookkeeping
//! (graph edges, segment refresh, audit rows) is best effort and never
//! fails the primary operation.

pub mod catalog;
pub mod checkout;
pub mod error;
pub mod invoicing;
pub mod orders;
pub mod page;
pub mod shopping;
pub mod state;
pub mod steps;

pub use catalog::{CatalogService, DEFAULT_ANALYTICS_DAYS, PriceAnalytics, ProductDetails};
pub use checkout::{CheckoutCoordinator, CheckoutOutcome, CheckoutRequest};
pub use error::{FulfillmentError, Result};
pub use invoicing::InvoiceRecorder;
pub use orders::{OrderAnalytics, OrderDesk};
pub use page::Page;
pub use shopping::CartCoordinator;
pub use state::{CheckoutProgress, FulfillmentState};
