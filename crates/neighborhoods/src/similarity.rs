//! Item-item similarity measures.
//!
//! The builder reduces the affinities of every user who touched both items
//! of a pair into a [`PairStats`], and every item into an [`ItemStats`].
//! A [`SimilarityMeasure`] turns those statistics into one score.
//!
//! Only the `graph_score` dimension of affinities with a positive graph
//! score feeds the statistics.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Statistics of one item pair over the users they share
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PairStats {
    /// Σ a_u · b_u
    pub dot: f64,
    /// Σ min(a_u, b_u), the link weight in the co-occurrence graph
    pub min_sum: f64,
    pub co_users: u32,
}

impl PairStats {
    /// Statistics contributed by a single shared user
    pub fn from_user(a: f64, b: f64) -> Self {
        Self {
            dot: a * b,
            min_sum: a.min(b),
            co_users: 1,
        }
    }
}

impl AddAssign for PairStats {
    fn add_assign(&mut self, rhs: Self) {
        self.dot += rhs.dot;
        self.min_sum += rhs.min_sum;
        self.co_users += rhs.co_users;
    }
}

/// Statistics of one item over all of its users
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ItemStats {
    pub squared_norm: f64,
    pub users: u32,
}

impl AddAssign for ItemStats {
    fn add_assign(&mut self, rhs: Self) {
        self.squared_norm += rhs.squared_norm;
        self.users += rhs.users;
    }
}

/// Pluggable similarity policy.
///
/// Implementations must be symmetric: swapping `a` and `b` must not change
/// the result.
pub trait SimilarityMeasure: Send + Sync {
    /// Returns the name of this measure (for logging/debugging)
    fn name(&self) -> &str;

    fn similarity(&self, pair: &PairStats, a: &ItemStats, b: &ItemStats) -> f64;
}

/// Link weight of the co-occurrence graph, shrunk by a Bayesian prior.
///
/// `w / (w + prior)` with `w = Σ min(a_u, b_u)`: pairs backed by a single
/// weak co-user stay well below pairs backed by many strong ones.
#[derive(Debug, Clone, Copy)]
pub struct GraphLinkSimilarity {
    prior: f64,
}

impl GraphLinkSimilarity {
    pub fn new(prior: f64) -> Self {
        Self { prior }
    }
}

impl Default for GraphLinkSimilarity {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl SimilarityMeasure for GraphLinkSimilarity {
    fn name(&self) -> &str {
        "GraphLinkSimilarity"
    }

    fn similarity(&self, pair: &PairStats, _a: &ItemStats, _b: &ItemStats) -> f64 {
        let weight = pair.min_sum;
        if weight <= 0.0 {
            return 0.0;
        }
        weight / (weight + self.prior)
    }
}

/// Cosine of the two items' graph-score vectors over all users
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineSimilarity;

impl SimilarityMeasure for CosineSimilarity {
    fn name(&self) -> &str {
        "CosineSimilarity"
    }

    fn similarity(&self, pair: &PairStats, a: &ItemStats, b: &ItemStats) -> f64 {
        let norms = (a.squared_norm * b.squared_norm).sqrt();
        if norms == 0.0 {
            return 0.0;
        }
        pair.dot / norms
    }
}

/// Configuration-friendly selector for the shipped measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    #[default]
    GraphLink,
    Cosine,
}

impl SimilarityKind {
    pub fn measure(self, prior: f64) -> Box<dyn SimilarityMeasure> {
        match self {
            SimilarityKind::GraphLink => Box::new(GraphLinkSimilarity::new(prior)),
            SimilarityKind::Cosine => Box::new(CosineSimilarity),
        }
    }
}
