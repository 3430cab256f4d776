//! Filter to drop obscure repositories.
//!
//! Removes candidates whose watcher count in the metadata catalog is below a
//! threshold.

use crate::context::RecContext;
use crate::traits::Filter;
use anyhow::Result;
use data_loader::{AffinityIndex, ScoredItem};
use std::sync::Arc;

/// Removes candidates below a watcher threshold.
///
/// ## Algorithm
/// For each candidate:
/// 1. Look up its metadata in the index
/// 2. Keep it if `watchers >= min_watchers`
/// 3. Without metadata, keep it only when no catalog was loaded at all
pub struct MinimumPopularityFilter {
    index: Arc<AffinityIndex>,
    min_watchers: u32,
}

impl MinimumPopularityFilter {
    pub fn new(index: Arc<AffinityIndex>, min_watchers: u32) -> Self {
        Self {
            index,
            min_watchers,
        }
    }
}

impl Filter for MinimumPopularityFilter {
    fn name(&self) -> &str {
        "MinimumPopularityFilter"
    }

    fn apply(&self, candidates: Vec<ScoredItem>, _context: &RecContext) -> Result<Vec<ScoredItem>> {
        let has_catalog = self.index.has_metadata();

        let filtered: Vec<ScoredItem> = candidates
            .into_iter()
            .filter(|candidate| match self.index.get_metadata(&candidate.item_id) {
                Some(metadata) => metadata.watchers >= self.min_watchers,
                None => !has_catalog,
            })
            .collect();

        Ok(filtered)
    }
}
