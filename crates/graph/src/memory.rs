use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use tokio::sync::RwLock;

use crate::{
    ActivityCounts, GraphError, Interaction, InteractionGraph, InvoiceEdge, OrderEdge,
    ProductNode, Result, Segment, UserNode, UserProfile,
};

#[derive(Default)]
struct Graph {
    users: HashMap<UserId, UserNode>,
    products: HashMap<ProductId, ProductNode>,
    interactions: Vec<Interaction>,
    orders: Vec<OrderEdge>,
    invoices: Vec<InvoiceEdge>,
}

/// In-memory graph store implementation for testing and local runs.
#[derive(Clone, Default)]
pub struct InMemoryInteractionGraph {
    graph: Arc<RwLock<Graph>>,
    fail_next: Arc<AtomicUsize>,
    fail_on_segment_write: Arc<AtomicBool>,
}

impl InMemoryInteractionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` operations fail with `Unavailable`.
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Makes every segment write fail until cleared.
    pub fn set_fail_on_segment_write(&self, fail: bool) {
        self.fail_on_segment_write.store(fail, Ordering::SeqCst);
    }

    pub async fn order_edges(&self, user_id: UserId) -> Vec<OrderEdge> {
        self.graph
            .read()
            .await
            .orders
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn invoice_edges(&self, user_id: UserId) -> Vec<InvoiceEdge> {
        self.graph
            .read()
            .await
            .invoices
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn interaction_count(&self) -> usize {
        self.graph.read().await.interactions.len()
    }

    fn check_available(&self) -> Result<()> {
        let consumed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            return Err(GraphError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

impl Graph {
    fn merge_user(&mut self, user_id: UserId) -> &mut UserNode {
        self.users
            .entry(user_id)
            .or_insert_with(|| UserNode::new(UserProfile::anonymous(user_id)))
    }
}

#[async_trait]
impl InteractionGraph for InMemoryInteractionGraph {
    async fn merge_user(&self, profile: UserProfile) -> Result<UserNode> {
        self.check_available()?;
        let mut graph = self.graph.write().await;
        let node = graph.merge_user(profile.user_id);
        node.profile = profile;
        Ok(node.clone())
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<()> {
        self.check_available()?;
        self.graph.write().await.merge_user(user_id);
        Ok(())
    }

    async fn user(&self, user_id: UserId) -> Result<Option<UserNode>> {
        self.check_available()?;
        Ok(self.graph.read().await.users.get(&user_id).cloned())
    }

    async fn users(&self, user_ids: &[UserId]) -> Result<Vec<UserNode>> {
        self.check_available()?;
        let graph = self.graph.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| graph.users.get(id).cloned())
            .collect())
    }

    async fn merge_product(
        &self,
        product_id: &ProductId,
        name: Option<&str>,
    ) -> Result<ProductNode> {
        self.check_available()?;
        let mut graph = self.graph.write().await;
        let node = graph
            .products
            .entry(product_id.clone())
            .or_insert_with(|| ProductNode {
                product_id: product_id.clone(),
                name: name.map(str::to_string),
            });
        Ok(node.clone())
    }

    async fn products(&self, product_ids: &[ProductId]) -> Result<Vec<ProductNode>> {
        self.check_available()?;
        let graph = self.graph.read().await;
        Ok(product_ids
            .iter()
            .filter_map(|id| graph.products.get(id).cloned())
            .collect())
    }

    async fn append_interaction(&self, interaction: Interaction) -> Result<()> {
        self.check_available()?;
        self.graph.write().await.interactions.push(interaction);
        Ok(())
    }

    async fn append_order(&self, edge: OrderEdge) -> Result<()> {
        self.check_available()?;
        self.graph.write().await.orders.push(edge);
        Ok(())
    }

    async fn append_invoice(&self, edge: InvoiceEdge) -> Result<()> {
        self.check_available()?;
        self.graph.write().await.invoices.push(edge);
        Ok(())
    }

    async fn activity_counts(&self, user_id: UserId) -> Result<ActivityCounts> {
        self.check_available()?;
        let graph = self.graph.read().await;
        Ok(ActivityCounts {
            interactions: graph
                .interactions
                .iter()
                .filter(|i| i.user_id == user_id)
                .count() as u64,
            orders: graph.orders.iter().filter(|o| o.user_id == user_id).count() as u64,
        })
    }

    async fn neighbourhood(&self, user_id: UserId) -> Result<Vec<Interaction>> {
        self.check_available()?;
        let graph = self.graph.read().await;

        let touched: HashSet<&ProductId> = graph
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id)
            .map(|i| &i.product_id)
            .collect();
        let neighbours: HashSet<UserId> = graph
            .interactions
            .iter()
            .filter(|i| touched.contains(&i.product_id))
            .map(|i| i.user_id)
            .chain(std::iter::once(user_id))
            .collect();

        Ok(graph
            .interactions
            .iter()
            .filter(|i| neighbours.contains(&i.user_id))
            .cloned()
            .collect())
    }

    async fn write_segment(
        &self,
        user_id: UserId,
        category: Segment,
        counts: ActivityCounts,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_available()?;
        if self.fail_on_segment_write.load(Ordering::SeqCst) {
            return Err(GraphError::Unavailable("segment write rejected".to_string()));
        }
        let mut graph = self.graph.write().await;
        let node = graph.merge_user(user_id);
        node.category = category;
        node.total_interactions = counts.interactions;
        node.total_orders = counts.orders;
        node.last_updated = Some(at);
        Ok(())
    }
}
