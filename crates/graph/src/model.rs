//! Nodes and edges stored in the interaction graph.

use chrono::{DateTime, Utc};
use common::{InvoiceId, Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::Segment;

/// What a user did with a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionAction {
    View,
    Click,
    AddToCart,
    RemoveFromCart,
    Purchase,
}

impl InteractionAction {
    /// Contribution of one edge of this kind to a recommendation score.
    pub fn weight(&self) -> f64 {
        match self {
            InteractionAction::AddToCart => 2.0,
            InteractionAction::View => 1.0,
            _ => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionAction::View => "VIEW",
            InteractionAction::Click => "CLICK",
            InteractionAction::AddToCart => "ADD_TO_CART",
            InteractionAction::RemoveFromCart => "REMOVE_FROM_CART",
            InteractionAction::Purchase => "PURCHASE",
        }
    }
}

impl std::fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile fields copied onto the user node at registration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Profile carrying only the id, used when a node is merged implicitly.
    pub fn anonymous(user_id: UserId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A user node with its denormalized segmentation fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserNode {
    pub profile: UserProfile,
    pub category: Segment,
    pub total_interactions: u64,
    pub total_orders: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserNode {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile,
            category: Segment::Low,
            total_interactions: 0,
            total_orders: 0,
            last_updated: None,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.profile.user_id
    }
}

/// A product node. The name is absent when the node was created by an
/// interaction that did not know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductNode {
    pub product_id: ProductId,
    pub name: Option<String>,
}

/// `(User)-[:INTERACTED]->(Product)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub action: InteractionAction,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn now(user_id: UserId, product_id: ProductId, action: InteractionAction) -> Self {
        Self {
            user_id,
            product_id,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// `(User)-[:PLACED_ORDER]->(Order)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEdge {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub total: Money,
    pub timestamp: DateTime<Utc>,
}

/// `(User)-[:GENERATED]->(Invoice)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEdge {
    pub user_id: UserId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
}

/// Edge counts segmentation is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActivityCounts {
    pub interactions: u64,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub common_interactions: usize,
}
