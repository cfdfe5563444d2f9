//! Recommendation and similarity scoring.
//!
//! Both analytics are pure functions of an [`InteractionIndex`]. A store
//! only has to hand over the edges around one user.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use common::{ProductId, UserId};

use crate::{Interaction, InteractionAction};

/// Points per distinct co-interacting user reaching a candidate product.
pub const CO_USER_WEIGHT: f64 = 10.0;

/// Interaction edges grouped by user.
#[derive(Debug, Clone, Default)]
pub struct InteractionIndex {
    by_user: HashMap<UserId, Vec<(ProductId, InteractionAction)>>,
}

impl InteractionIndex {
    pub fn new(interactions: &[Interaction]) -> Self {
        let mut by_user: HashMap<UserId, Vec<(ProductId, InteractionAction)>> = HashMap::new();
        for i in interactions {
            by_user
                .entry(i.user_id)
                .or_default()
                .push((i.product_id.clone(), i.action));
        }
        Self { by_user }
    }

    /// Distinct products a user has touched.
    pub fn products_of(&self, user_id: UserId) -> HashSet<&ProductId> {
        self.by_user
            .get(&user_id)
            .map(|edges| edges.iter().map(|(p, _)| p).collect())
            .unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }
}

#[derive(Default)]
struct Candidate {
    co_users: HashSet<UserId>,
    edges: u32,
    weight: f64,
}

impl Candidate {
    fn score(&self) -> f64 {
        CO_USER_WEIGHT * self.co_users.len() as f64 + f64::from(self.edges) + self.weight
    }
}

/// Products to suggest to `user_id`, best first.
///
/// Candidates are products touched by users who share at least one product
/// with `user_id`, minus products `user_id` already touched. Each candidate
/// scores `10 × distinct co-users + edge count + Σ action weight` over the
/// co-users' edges to it. Equal scores order by product id.
pub fn recommend(index: &InteractionIndex, user_id: UserId, limit: usize) -> Vec<(ProductId, f64)> {
    let touched = index.products_of(user_id);
    if touched.is_empty() {
        return Vec::new();
    }

    let mut candidates: BTreeMap<&ProductId, Candidate> = BTreeMap::new();
    for (other, edges) in &index.by_user {
        if *other == user_id || !edges.iter().any(|(p, _)| touched.contains(p)) {
            continue;
        }
        for (product, action) in edges {
            if touched.contains(product) {
                continue;
            }
            let candidate = candidates.entry(product).or_default();
            candidate.co_users.insert(*other);
            candidate.edges += 1;
            candidate.weight += action.weight();
        }
    }

    let mut scored: Vec<(ProductId, f64)> = candidates
        .into_iter()
        .map(|(product, candidate)| (product.clone(), candidate.score()))
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(limit);
    scored
}

/// Other users ranked by how many distinct products they share with `user_id`.
pub fn similar_users(index: &InteractionIndex, user_id: UserId, limit: usize) -> Vec<(UserId, usize)> {
    let mine = index.products_of(user_id);
    if mine.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<(UserId, usize)> = index
        .by_user
        .keys()
        .filter(|other| **other != user_id)
        .map(|other| {
            let common = index.products_of(*other).intersection(&mine).count();
            (*other, common)
        })
        .filter(|(_, common)| *common > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}
