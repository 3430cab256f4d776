//! Core traits for the recommendation filter chain.
//!
//! Every candidate list, whether it belongs to an item or to a user, passes
//! through a chain of `Filter`s before it is ranked and truncated.

use crate::context::RecContext;
use anyhow::Result;
use data_loader::ScoredItem;

/// Core trait for filtering candidates.
///
/// ## Design Note
/// - `Send + Sync` lets one chain serve every rayon worker
/// - Filters take ownership of the candidate list and return the survivors
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a set of candidates.
    ///
    /// # Arguments
    /// * `candidates` - The candidates to filter (takes ownership)
    /// * `context` - The subject the candidates are recommended to
    fn apply(&self, candidates: Vec<ScoredItem>, context: &RecContext) -> Result<Vec<ScoredItem>>;
}
