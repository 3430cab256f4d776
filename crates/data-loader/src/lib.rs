//! # Data Loader Crate
//!
//! This crate handles reading repository-activity event logs and the
//! tab-separated datasets every pipeline stage exchanges.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Event, Affinity, ItemMetadata, ranked lists)
//! - **parser**: Parse event logs and datasets into Rust structs
//! - **writer**: Write datasets atomically
//! - **files**: Expand event-log patterns and load logs in parallel
//! - **index**: Build the AffinityIndex used by the recommendation stages
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::AffinityIndex;
//! use std::path::Path;
//!
//! let index = AffinityIndex::load_from_files(
//!     Path::new("out/user_item_affinities"),
//!     Path::new("out/item_metadata"),
//! )?;
//!
//! let affinities = index.get_user_affinities("alice");
//! println!("alice interacted with {} repositories", affinities.len());
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod writer;
pub mod files;
pub mod index;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use writer::DatasetBatch;
pub use types::{
    // Type aliases
    UserId,
    ItemId,
    // Core types
    Event,
    EventRecord,
    ItemMetadata,
    Affinity,
    InterestDimension,
    ScoredItem,
    ItemNeighborhood,
    Recommendation,
    AffinityIndex,
    rank_and_truncate,
};
