//! Catalog-wide popularity, the prior blended into cold-start lists.
//!
//! `popularity(j)` is the summed positive graph score of item `j` divided by
//! the largest such sum in the catalog, so the most popular item scores 1.0.

use data_loader::{AffinityIndex, ItemId, ScoredItem};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Normalized popularity of every item with a positive graph score
#[derive(Debug, Clone, Default)]
pub struct PopularityTable {
    scores: HashMap<ItemId, f64>,
    /// All scored items in ranking order
    ranked: Vec<ScoredItem>,
}

impl PopularityTable {
    pub fn from_index(index: &AffinityIndex) -> Self {
        let totals: HashMap<ItemId, f64> = index
            .item_ids()
            .into_par_iter()
            .filter_map(|item_id| {
                let total: f64 = index
                    .get_item_affinities(&item_id)
                    .iter()
                    .map(|a| a.graph_score)
                    .filter(|g| *g > 0.0)
                    .sum();
                (total > 0.0).then_some((item_id, total))
            })
            .collect();

        let max = totals.values().copied().fold(0.0_f64, f64::max);
        if max <= 0.0 {
            return Self::default();
        }

        let scores: HashMap<ItemId, f64> = totals
            .into_iter()
            .map(|(item_id, total)| (item_id, total / max))
            .collect();

        let mut ranked: Vec<ScoredItem> = scores
            .iter()
            .map(|(item_id, score)| ScoredItem::new(item_id.clone(), *score))
            .collect();
        ranked.sort_by(ScoredItem::ranking_cmp);

        debug!("Popularity table covers {} items", ranked.len());
        Self { scores, ranked }
    }

    /// Normalized popularity in [0, 1]; zero for unknown items
    pub fn popularity(&self, item_id: &str) -> f64 {
        self.scores.get(item_id).copied().unwrap_or(0.0)
    }

    /// The `n` most popular items in ranking order
    pub fn top(&self, n: usize) -> &[ScoredItem] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
