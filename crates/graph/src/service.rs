use std::collections::HashMap;

use chrono::Utc;
use common::{InvoiceId, Money, OrderId, ProductId, UserId};

use crate::{
    Interaction, InteractionAction, InteractionGraph, InteractionIndex, InvoiceEdge, OrderEdge,
    Recommendation, Result, Segment, SegmentationEngine, SimilarUser, UserNode, UserProfile,
    analytics,
};

/// Records user activity in the graph and serves graph-derived analytics.
#[derive(Clone)]
pub struct GraphService<G: InteractionGraph + Clone> {
    graph: G,
    segmentation: SegmentationEngine<G>,
}

impl<G: InteractionGraph + Clone> GraphService<G> {
    pub fn new(graph: G) -> Self {
        Self {
            segmentation: SegmentationEngine::new(graph.clone()),
            graph,
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Creates or refreshes a user node. Existing counters are kept.
    #[tracing::instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    pub async fn register_user(&self, profile: UserProfile) -> Result<UserNode> {
        self.graph.merge_user(profile).await
    }

    pub async fn user(&self, user_id: UserId) -> Result<Option<UserNode>> {
        self.graph.user(user_id).await
    }

    /// Appends an interaction edge, then refreshes the user's segment.
    ///
    /// The product node is created on first sight; a name given later does
    /// not overwrite the first one. A failed segment refresh is logged and
    /// does not fail the call.
    #[tracing::instrument(skip(self, product_name))]
    pub async fn record_interaction(
        &self,
        user_id: UserId,
        product_id: &ProductId,
        action: InteractionAction,
        product_name: Option<&str>,
    ) -> Result<()> {
        self.graph.ensure_user(user_id).await?;
        self.graph.merge_product(product_id, product_name).await?;
        self.graph
            .append_interaction(Interaction::now(user_id, product_id.clone(), action))
            .await?;

        if let Err(e) = self.segmentation.refresh(user_id).await {
            tracing::warn!(%user_id, error = %e, "segment refresh after interaction failed");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_order(&self, user_id: UserId, order_id: OrderId, total: Money) -> Result<()> {
        self.graph.ensure_user(user_id).await?;
        self.graph
            .append_order(OrderEdge {
                user_id,
                order_id,
                total,
                timestamp: Utc::now(),
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_invoice(
        &self,
        user_id: UserId,
        invoice_id: InvoiceId,
        amount: Money,
    ) -> Result<()> {
        self.graph.ensure_user(user_id).await?;
        self.graph
            .append_invoice(InvoiceEdge {
                user_id,
                invoice_id,
                amount,
                timestamp: Utc::now(),
            })
            .await
    }

    pub async fn refresh_segment(&self, user_id: UserId) -> Result<Segment> {
        self.segmentation.refresh(user_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn recommend(&self, user_id: UserId, limit: usize) -> Result<Vec<Recommendation>> {
        let edges = self.graph.neighbourhood(user_id).await?;
        let scored = analytics::recommend(&InteractionIndex::new(&edges), user_id, limit);
        if scored.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = scored.iter().map(|(id, _)| id.clone()).collect();
        let mut names: HashMap<ProductId, Option<String>> = self
            .graph
            .products(&ids)
            .await?
            .into_iter()
            .map(|node| (node.product_id, node.name))
            .collect();

        Ok(scored
            .into_iter()
            .map(|(product_id, score)| Recommendation {
                name: names.remove(&product_id).flatten(),
                product_id,
                score,
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn similar_users(&self, user_id: UserId, limit: usize) -> Result<Vec<SimilarUser>> {
        let edges = self.graph.neighbourhood(user_id).await?;
        let ranked = analytics::similar_users(&InteractionIndex::new(&edges), user_id, limit);
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<UserId> = ranked.iter().map(|(id, _)| *id).collect();
        let profiles: HashMap<UserId, UserProfile> = self
            .graph
            .users(&ids)
            .await?
            .into_iter()
            .map(|node| (node.user_id(), node.profile))
            .collect();

        Ok(ranked
            .into_iter()
            .map(|(user_id, common_interactions)| {
                let profile = profiles
                    .get(&user_id)
                    .cloned()
                    .unwrap_or_else(|| UserProfile::anonymous(user_id));
                SimilarUser {
                    user_id,
                    name: profile.display_name(),
                    email: profile.email,
                    common_interactions,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryInteractionGraph;

    fn service() -> (GraphService<InMemoryInteractionGraph>, InMemoryInteractionGraph) {
        let graph = InMemoryInteractionGraph::new();
        (GraphService::new(graph.clone()), graph)
    }

    #[tokio::test]
    async fn test_interaction_merges_unknown_user_and_product() {
        let (service, graph) = service();
        let user = UserId::new();
        let pid = ProductId::new("p1");

        service
            .record_interaction(user, &pid, InteractionAction::View, Some("Lamp"))
            .await
            .unwrap();

        let node = graph.user(user).await.unwrap().unwrap();
        assert_eq!(node.total_interactions, 1);
        let products = graph.products(&[pid]).await.unwrap();
        assert_eq!(products[0].name.as_deref(), Some("Lamp"));
    }

    #[tokio::test]
    async fn test_segment_refresh_failure_is_swallowed() {
        let (service, graph) = service();
        let user = UserId::new();
        graph.set_fail_on_segment_write(true);

        service
            .record_interaction(user, &ProductId::new("p1"), InteractionAction::View, None)
            .await
            .unwrap();

        assert_eq!(graph.interaction_count().await, 1);
        let node = graph.user(user).await.unwrap().unwrap();
        assert_eq!(node.last_updated, None);
    }

    #[tokio::test]
    async fn test_recommendations_carry_names() {
        let (service, _) = service();
        let (me, other) = (UserId::new(), UserId::new());
        let shared = ProductId::new("shared");

        service
            .record_interaction(me, &shared, InteractionAction::View, Some("Shared"))
            .await
            .unwrap();
        service
            .record_interaction(other, &shared, InteractionAction::View, None)
            .await
            .unwrap();
        service
            .record_interaction(other, &ProductId::new("lamp"), InteractionAction::AddToCart, Some("Lamp"))
            .await
            .unwrap();
        service
            .record_interaction(other, &ProductId::new("mystery"), InteractionAction::View, None)
            .await
            .unwrap();

        let recs = service.recommend(me, 5).await.unwrap();

        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].product_id, ProductId::new("lamp"));
        assert_eq!(recs[0].name.as_deref(), Some("Lamp"));
        assert_eq!(recs[1].name, None);
    }

    #[tokio::test]
    async fn test_similar_users_carry_profiles() {
        let (service, _) = service();
        let (me, other) = (UserId::new(), UserId::new());
        service
            .register_user(UserProfile::new(other, "grace@example.com", "Grace", "Hopper"))
            .await
            .unwrap();

        for user in [me, other] {
            service
                .record_interaction(user, &ProductId::new("p1"), InteractionAction::View, None)
                .await
                .unwrap();
        }

        let similar = service.similar_users(me, 5).await.unwrap();

        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].email, "grace@example.com");
        assert_eq!(similar[0].name, "Grace Hopper");
        assert_eq!(similar[0].common_interactions, 1);
    }

    #[tokio::test]
    async fn test_order_edges_count_toward_segment() {
        let (service, graph) = service();
        let user = UserId::new();

        for _ in 0..5 {
            service
                .record_order(user, OrderId::new(), Money::from_cents(1000))
                .await
                .unwrap();
        }

        assert_eq!(service.refresh_segment(user).await.unwrap(), Segment::Medium);
        assert_eq!(graph.order_edges(user).await.len(), 5);
    }
}
