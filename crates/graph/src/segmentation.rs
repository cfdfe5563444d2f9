//! Activity tiers derived from graph edge counts.

use chrono::Utc;
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::{ActivityCounts, InteractionGraph, Result};

/// Activity tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    #[default]
    Low,
    Medium,
    Top,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Low => "LOW",
            Segment::Medium => "MEDIUM",
            Segment::Top => "TOP",
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a user from order and interaction edge counts.
pub fn classify(orders: u64, interactions: u64) -> Segment {
    if orders >= 10 || interactions >= 50 {
        Segment::Top
    } else if orders >= 5 || interactions >= 25 {
        Segment::Medium
    } else {
        Segment::Low
    }
}

/// Recomputes a user's tier and writes it back onto the user node.
#[derive(Clone)]
pub struct SegmentationEngine<G: InteractionGraph> {
    graph: G,
}

impl<G: InteractionGraph> SegmentationEngine<G> {
    pub fn new(graph: G) -> Self {
        Self { graph }
    }

    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self, user_id: UserId) -> Result<Segment> {
        let counts: ActivityCounts = self.graph.activity_counts(user_id).await?;
        let segment = classify(counts.orders, counts.interactions);

        self.graph
            .write_segment(user_id, segment, counts, Utc::now())
            .await?;

        metrics::counter!("segment_refresh_total", "segment" => segment.as_str()).increment(1);
        tracing::debug!(
            %segment,
            orders = counts.orders,
            interactions = counts.interactions,
            "segment refreshed"
        );
        Ok(segment)
    }
}
