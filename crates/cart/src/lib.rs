//! Shopping cart state kept in the key-value store.
//!
//! Each user has one live cart (`cart:{user}`) and a bounded list of
//! snapshots (`cart_history:{user}`) captured after every mutation. History
//! exists only to support point-in-time revert; the live key is always the
//! authoritative cart.
//!
//! All operations are single-key read-modify-write cycles. Concurrent
//! mutations of the same user's cart race and the last write wins.

pub mod error;
pub mod model;
pub mod session;
pub mod store;

pub use error::{CartError, Result};
pub use model::{Cart, CartItem, CartSnapshot};
pub use session::SessionStore;
pub use store::{CartStore, DEFAULT_HISTORY_LIMIT};
