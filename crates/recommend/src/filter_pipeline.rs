//! The FilterPipeline chains multiple filters.

use crate::context::RecContext;
use crate::traits::Filter;
use anyhow::{Context, Result};
use data_loader::ScoredItem;

/// Chains multiple filters together into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(AlreadyInteractedFilter)
///     .add_filter(OwnItemsFilter::new(index.clone()))
///     .add_filter(MinimumPopularityFilter::new(index.clone(), 5));
///
/// let filtered = pipeline.apply(candidates, &context)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    /// Create a new empty FilterPipeline.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the pipeline (builder pattern).
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Names of the filters in application order
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Apply all filters in sequence to the candidates.
    ///
    /// # Returns
    /// * `Ok(Vec<ScoredItem>)` - The candidates that survived every filter
    /// * `Err` - If any filter fails, tagged with the filter and subject
    pub fn apply(&self, candidates: Vec<ScoredItem>, context: &RecContext) -> Result<Vec<ScoredItem>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter.apply(current, context).with_context(|| {
                format!("filter {} failed for {}", filter.name(), context.subject_id)
            })?;
            tracing::trace!(
                "{}: {} -> {} candidates for {}",
                filter.name(),
                before,
                current.len(),
                context.subject_id
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::AlreadyInteractedFilter;

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let context = RecContext::for_item("o/a");

        let candidates = vec![ScoredItem::new("o/b", 0.9), ScoredItem::new("o/c", 0.8)];

        let filtered = pipeline.apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_single_filter() {
        let mut context = RecContext::for_item("o/a");
        context.interacted_items.insert("o/b".to_string());

        let pipeline = FilterPipeline::new().add_filter(AlreadyInteractedFilter);
        assert_eq!(pipeline.filter_names(), vec!["AlreadyInteractedFilter"]);

        let candidates = vec![ScoredItem::new("o/b", 0.9), ScoredItem::new("o/c", 0.8)];

        let filtered = pipeline.apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].item_id, "o/c");
    }

    struct FailingFilter;

    impl Filter for FailingFilter {
        fn name(&self) -> &str {
            "FailingFilter"
        }

        fn apply(&self, _: Vec<ScoredItem>, _: &RecContext) -> Result<Vec<ScoredItem>> {
            anyhow::bail!("lookup failed")
        }
    }

    #[test]
    fn test_filter_error_names_filter_and_subject() {
        let pipeline = FilterPipeline::new().add_filter(FailingFilter);
        let err = pipeline
            .apply(vec![ScoredItem::new("o/b", 0.9)], &RecContext::for_item("o/a"))
            .unwrap_err();
        assert_eq!(err.to_string(), "filter FailingFilter failed for o/a");
    }
}
