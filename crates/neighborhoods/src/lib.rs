//! # Neighborhoods Crate
//!
//! Builds item-to-item neighborhoods ("users who engaged with this
//! repository also engaged with...") from the extracted affinities.
//!
//! ## Components
//!
//! - **similarity**: the `SimilarityMeasure` trait and the shipped measures
//! - **builder**: `ItemNeighborhoodBuilder`, co-occurrence counting and ranking
//!
//! ## Example Usage
//!
//! ```ignore
//! use neighborhoods::{ItemNeighborhoodBuilder, NeighborhoodConfig};
//! use std::sync::Arc;
//!
//! let index = Arc::new(AffinityIndex::load_from_files(&affinities, &metadata)?);
//! let neighborhoods = ItemNeighborhoodBuilder::from_config(index, &NeighborhoodConfig::default())
//!     .build();
//! ```

pub mod similarity;
pub mod builder;

pub use similarity::{
    CosineSimilarity, GraphLinkSimilarity, ItemStats, PairStats, SimilarityKind, SimilarityMeasure,
};
pub use builder::{ItemNeighborhoodBuilder, NeighborhoodConfig};
