use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ProductId, UserId};

use crate::{
    ActivityCounts, Interaction, InvoiceEdge, OrderEdge, ProductNode, Result, Segment, UserNode,
    UserProfile,
};

/// Core trait for graph store implementations.
///
/// Edges are append-only. Node writes are merges: creating a node that
/// already exists never clears what is stored on it.
#[async_trait]
pub trait InteractionGraph: Send + Sync {
    /// Creates the user node, or refreshes its profile fields if it exists.
    async fn merge_user(&self, profile: UserProfile) -> Result<UserNode>;

    /// Creates a bare `LOW` user node if none exists.
    async fn ensure_user(&self, user_id: UserId) -> Result<()>;

    async fn user(&self, user_id: UserId) -> Result<Option<UserNode>>;

    async fn users(&self, user_ids: &[UserId]) -> Result<Vec<UserNode>>;

    /// Creates the product node if absent. An existing name is never replaced.
    async fn merge_product(&self, product_id: &ProductId, name: Option<&str>)
    -> Result<ProductNode>;

    async fn products(&self, product_ids: &[ProductId]) -> Result<Vec<ProductNode>>;

    async fn append_interaction(&self, interaction: Interaction) -> Result<()>;

    async fn append_order(&self, edge: OrderEdge) -> Result<()>;

    async fn append_invoice(&self, edge: InvoiceEdge) -> Result<()>;

    /// Interaction and order edge counts out of a user node.
    async fn activity_counts(&self, user_id: UserId) -> Result<ActivityCounts>;

    /// Interactions within two hops of a user: the user's own edges plus every
    /// edge of users who share at least one product with them.
    async fn neighbourhood(&self, user_id: UserId) -> Result<Vec<Interaction>>;

    /// Writes the segmentation fields onto the user node, merging it first.
    async fn write_segment(
        &self,
        user_id: UserId,
        category: Segment,
        counts: ActivityCounts,
        at: DateTime<Utc>,
    ) -> Result<()>;
}
