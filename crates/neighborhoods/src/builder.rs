//! Item neighborhood construction.
//!
//! "Users who engaged with this repository also engaged with these"
//!
//! ## Algorithm
//! 1. For each user, take the items with a positive graph score
//!    (users above `max_items_per_user` are skipped)
//! 2. Every pair of those items gets the user's contribution to its
//!    [`PairStats`]; every item gets the user's contribution to its
//!    [`ItemStats`]
//! 3. Score each pair with the configured [`SimilarityMeasure`]
//! 4. Attach the pair to both anchors, rank and truncate each list
//!
//! Steps 1-2 are a rayon fold/reduce over users; step 4 runs in parallel
//! over anchors.

use crate::similarity::{ItemStats, PairStats, SimilarityKind, SimilarityMeasure};
use data_loader::{AffinityIndex, ItemId, ItemNeighborhood, ScoredItem, rank_and_truncate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Tuning knobs for neighborhood construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborhoodConfig {
    /// Maximum number of neighbors kept per anchor
    pub neighborhood_size: usize,
    /// Minimum number of shared users for a pair to count
    pub min_co_users: u32,
    /// Users with more interacted items than this are left out of pairing
    pub max_items_per_user: usize,
    pub similarity: SimilarityKind,
    /// Bayesian prior of the graph-link measure
    pub prior: f64,
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        Self {
            neighborhood_size: 20,
            min_co_users: 1,
            max_items_per_user: 500,
            similarity: SimilarityKind::GraphLink,
            prior: 1.0,
        }
    }
}

type PairKey = (ItemId, ItemId);

#[derive(Default)]
struct CoOccurrence {
    pairs: HashMap<PairKey, PairStats>,
    items: HashMap<ItemId, ItemStats>,
    skipped_users: usize,
}

impl CoOccurrence {
    fn merge(mut self, other: CoOccurrence) -> CoOccurrence {
        for (key, stats) in other.pairs {
            *self.pairs.entry(key).or_default() += stats;
        }
        for (item, stats) in other.items {
            *self.items.entry(item).or_default() += stats;
        }
        self.skipped_users += other.skipped_users;
        self
    }
}

/// Builds a ranked neighborhood for every item in the affinity index
pub struct ItemNeighborhoodBuilder {
    /// Shared reference to the extracted affinities (read-only, so no Mutex needed)
    index: Arc<AffinityIndex>,
    measure: Box<dyn SimilarityMeasure>,
    neighborhood_size: usize,
    min_co_users: u32,
    max_items_per_user: usize,
}

impl ItemNeighborhoodBuilder {
    /// Create a builder with the default configuration
    pub fn new(index: Arc<AffinityIndex>) -> Self {
        Self::from_config(index, &NeighborhoodConfig::default())
    }

    pub fn from_config(index: Arc<AffinityIndex>, config: &NeighborhoodConfig) -> Self {
        Self {
            index,
            measure: config.similarity.measure(config.prior),
            neighborhood_size: config.neighborhood_size,
            min_co_users: config.min_co_users,
            max_items_per_user: config.max_items_per_user,
        }
    }

    /// Swap in a custom similarity measure
    pub fn with_measure(mut self, measure: impl SimilarityMeasure + 'static) -> Self {
        self.measure = Box::new(measure);
        self
    }

    /// Configure the maximum neighborhood size (default: 20)
    pub fn with_neighborhood_size(mut self, size: usize) -> Self {
        self.neighborhood_size = size;
        self
    }

    /// Configure the minimum number of shared users (default: 1)
    pub fn with_min_co_users(mut self, min: u32) -> Self {
        self.min_co_users = min;
        self
    }

    /// Configure the per-user item cap for pairing (default: 500)
    pub fn with_max_items_per_user(mut self, max: usize) -> Self {
        self.max_items_per_user = max;
        self
    }

    /// Build neighborhoods for every item, sorted by anchor id.
    ///
    /// Items without any qualifying neighbor get an empty list.
    #[instrument(skip(self), fields(measure = self.measure.name()))]
    pub fn build(&self) -> Vec<ItemNeighborhood> {
        let co = self.co_occurrences();
        debug!(
            "Counted {} item pairs over {} items ({} users skipped)",
            co.pairs.len(),
            co.items.len(),
            co.skipped_users
        );

        let candidates = self.score_pairs(&co);

        let mut neighborhoods: Vec<ItemNeighborhood> = self
            .index
            .item_ids()
            .into_par_iter()
            .map(|anchor_item_id| {
                let mut neighbors: Vec<ScoredItem> = candidates
                    .get(&anchor_item_id)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|n| self.is_servable(&n.item_id))
                    .collect();
                rank_and_truncate(&mut neighbors, self.neighborhood_size);
                ItemNeighborhood {
                    anchor_item_id,
                    neighbors,
                }
            })
            .collect();
        neighborhoods.sort_by(|a, b| a.anchor_item_id.cmp(&b.anchor_item_id));

        let non_empty = neighborhoods.iter().filter(|n| !n.neighbors.is_empty()).count();
        info!(
            "Built {} neighborhoods ({} non-empty)",
            neighborhoods.len(),
            non_empty
        );
        neighborhoods
    }

    /// Accumulate pair and item statistics over all users
    fn co_occurrences(&self) -> CoOccurrence {
        let users = self.index.user_ids();

        users
            .par_iter()
            .fold(CoOccurrence::default, |mut local, user_id| {
                let mut items: Vec<(&str, f64)> = self
                    .index
                    .get_user_affinities(user_id)
                    .iter()
                    .filter(|a| a.graph_score > 0.0)
                    .map(|a| (a.item_id.as_str(), a.graph_score))
                    .collect();

                if items.len() > self.max_items_per_user {
                    local.skipped_users += 1;
                    return local;
                }
                items.sort_unstable_by(|a, b| a.0.cmp(b.0));

                for (i, &(item_a, score_a)) in items.iter().enumerate() {
                    *local.items.entry(item_a.to_string()).or_default() += ItemStats {
                        squared_norm: score_a * score_a,
                        users: 1,
                    };
                    for &(item_b, score_b) in &items[i + 1..] {
                        *local
                            .pairs
                            .entry((item_a.to_string(), item_b.to_string()))
                            .or_default() += PairStats::from_user(score_a, score_b);
                    }
                }
                local
            })
            .reduce(CoOccurrence::default, CoOccurrence::merge)
    }

    /// Score every qualifying pair and attach it to both anchors
    fn score_pairs(&self, co: &CoOccurrence) -> HashMap<ItemId, Vec<ScoredItem>> {
        let empty = ItemStats::default();
        let mut candidates: HashMap<ItemId, Vec<ScoredItem>> = HashMap::new();

        for ((item_a, item_b), pair) in &co.pairs {
            if pair.co_users < self.min_co_users {
                continue;
            }
            let stats_a = co.items.get(item_a).unwrap_or(&empty);
            let stats_b = co.items.get(item_b).unwrap_or(&empty);
            let similarity = self.measure.similarity(pair, stats_a, stats_b);
            if !similarity.is_finite() || similarity <= 0.0 {
                continue;
            }

            candidates
                .entry(item_a.clone())
                .or_default()
                .push(ScoredItem::new(item_b.clone(), similarity));
            candidates
                .entry(item_b.clone())
                .or_default()
                .push(ScoredItem::new(item_a.clone(), similarity));
        }
        candidates
    }

    /// With a metadata catalog loaded, only catalogued items may be neighbors
    fn is_servable(&self, item_id: &str) -> bool {
        !self.index.has_metadata() || self.index.get_metadata(item_id).is_some()
    }
}
