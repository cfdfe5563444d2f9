//! Key-value store collaborator.
//!
//! The storefront keeps ephemeral state (live carts, cart history, sessions)
//! and read caches in a low-latency key-value store. This crate defines the
//! narrow interface the core needs and an in-memory implementation with TTL
//! expiry used in tests and single-process deployments.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{KvError, Result};
pub use memory::InMemoryKeyValueStore;
pub use store::{KeyValueStore, KeyValueStoreExt};
