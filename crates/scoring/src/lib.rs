//! # Scoring Crate
//!
//! Turns raw repository events into scaled user-item affinities.
//!
//! ## Components
//!
//! - **valuation**: closed `EventType` enum and its weight table
//! - **scaling**: logistic squashing of accumulated weights into (-1, 1)
//! - **affinity**: parallel per-(user, item) aggregation
//! - **extract**: metadata, gravatar ids and id lists for the extract stage
//!
//! `value_event` and `logistic_scale` are pure functions with no hidden
//! state, so they can be called from any thread, on any partition of the
//! events, in any order.
//!
//! ## Example Usage
//!
//! ```ignore
//! use scoring::{AffinityAggregator, value_event, logistic_scale};
//!
//! let weights = value_event("ForkEvent")?;
//! let scaled = logistic_scale(weights.general_interest);
//!
//! let (affinities, stats) = AffinityAggregator::new().aggregate(&events)?;
//! ```

pub mod error;
pub mod valuation;
pub mod scaling;
pub mod affinity;
pub mod extract;

pub use error::{Result, ScoringError};
pub use valuation::{EventType, WeightVector, value_event};
pub use scaling::{LOGISTIC_PARAM, logistic_scale, scale_vector};
pub use affinity::{AffinityAggregator, AggregationStats, InvalidEventPolicy};
pub use extract::{SideFacts, distinct_ids, split_records};
