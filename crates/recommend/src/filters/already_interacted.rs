//! Filter to remove items the subject already has an affinity with.
//!
//! This is always the first filter of the emitter's chain: recommending a
//! repository someone already pushes to is pointless.

use crate::context::RecContext;
use crate::traits::Filter;
use anyhow::Result;
use data_loader::ScoredItem;

/// Removes candidates found in `RecContext::interacted_items`.
pub struct AlreadyInteractedFilter;

impl Filter for AlreadyInteractedFilter {
    fn name(&self) -> &str {
        "AlreadyInteractedFilter"
    }

    fn apply(&self, candidates: Vec<ScoredItem>, context: &RecContext) -> Result<Vec<ScoredItem>> {
        let filtered: Vec<ScoredItem> = candidates
            .into_iter()
            .filter(|candidate| !context.interacted_items.contains(&candidate.item_id))
            .collect();
        Ok(filtered)
    }
}
