//! Filter implementations for the candidate chain.

pub mod already_interacted;
pub mod minimum_popularity;
pub mod own_items;

// Re-export for convenience
pub use already_interacted::AlreadyInteractedFilter;
pub use minimum_popularity::MinimumPopularityFilter;
pub use own_items::OwnItemsFilter;
