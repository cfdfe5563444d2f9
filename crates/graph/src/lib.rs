//! Interaction graph, recommendations and user segmentation.
//!
//! The graph records append-only edges from users to products, orders and
//! invoices. Analytics are pure functions over an [`InteractionIndex`] built
//! from the edges a store returns for one user's neighbourhood, so scoring
//! can be tested without any store at all.

pub mod analytics;
pub mod error;
pub mod memory;
pub mod model;
pub mod segmentation;
pub mod service;
pub mod store;

pub use analytics::{InteractionIndex, recommend, similar_users};
pub use error::{GraphError, Result};
pub use memory::InMemoryInteractionGraph;
pub use model::{
    ActivityCounts, Interaction, InteractionAction, InvoiceEdge, OrderEdge, ProductNode,
    Recommendation, SimilarUser, UserNode, UserProfile,
};
pub use segmentation::{Segment, SegmentationEngine, classify};
pub use service::GraphService;
pub use store::InteractionGraph;
