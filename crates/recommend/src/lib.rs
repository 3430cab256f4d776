//! Recommendation emission for items and users.
//!
//! This crate provides:
//! - `RecContext`, the per-subject history used for scoring and filtering
//! - Filter trait and implementations, composed by `FilterPipeline`
//! - `PopularityTable`, the cold-start prior
//! - `RecommendationEmitter`, which produces `item_recs`,
//!   `user_specific_recs` and `user_general_recs`
//!
//! ## Architecture
//! Each list is produced in three steps:
//! 1. Score candidates from the subject's neighborhoods (and the prior)
//! 2. Run the candidates through the filter chain
//! 3. Rank with the shared tie-break rule and truncate to `max_recs`
//!
//! ## Example Usage
//! ```ignore
//! use recommend::{RecommendConfig, RecommendationEmitter};
//!
//! let emitter = RecommendationEmitter::new(index.clone(), neighborhoods, RecommendConfig::default());
//! let item_recs = emitter.item_recs()?;
//! let specific = emitter.user_specific_recs(&user_ids)?;
//! ```

pub mod traits;
pub mod context;
pub mod filters;
pub mod filter_pipeline;
pub mod popularity;
pub mod emitter;

// Re-export main types
pub use traits::Filter;
pub use context::{RecContext, SubjectKind};
pub use filter_pipeline::FilterPipeline;
pub use popularity::PopularityTable;
pub use emitter::{RecommendConfig, RecommendationEmitter};
