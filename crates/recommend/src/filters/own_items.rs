//! Filter to remove repositories owned by the user being served.

use crate::context::{RecContext, SubjectKind};
use crate::traits::Filter;
use anyhow::Result;
use data_loader::{AffinityIndex, ScoredItem};
use std::sync::Arc;

/// Drops candidates whose owner is the user the list is for.
///
/// Ownership is read from the metadata catalog, falling back to the
/// `owner/` prefix of the item id. Item subjects pass unchanged.
pub struct OwnItemsFilter {
    index: Arc<AffinityIndex>,
}

impl OwnItemsFilter {
    pub fn new(index: Arc<AffinityIndex>) -> Self {
        Self { index }
    }

    fn owner_of<'a>(&'a self, item_id: &'a str) -> Option<&'a str> {
        match self.index.get_metadata(item_id) {
            Some(metadata) => Some(metadata.owner.as_str()),
            None => item_id.split_once('/').map(|(owner, _)| owner),
        }
    }
}

impl Filter for OwnItemsFilter {
    fn name(&self) -> &str {
        "OwnItemsFilter"
    }

    fn apply(&self, candidates: Vec<ScoredItem>, context: &RecContext) -> Result<Vec<ScoredItem>> {
        if context.kind != SubjectKind::User {
            return Ok(candidates);
        }

        let filtered: Vec<ScoredItem> = candidates
            .into_iter()
            .filter(|candidate| self.owner_of(&candidate.item_id) != Some(context.subject_id.as_str()))
            .collect();
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_items_are_dropped_for_users() {
        let filter = OwnItemsFilter::new(Arc::new(AffinityIndex::new()));
        let context = RecContext::for_user(&AffinityIndex::new(), "alice");

        let candidates = vec![
            ScoredItem::new("alice/dotfiles", 0.9),
            ScoredItem::new("bob/alice", 0.8),
        ];

        let filtered = filter.apply(candidates, &context).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].item_id, "bob/alice");
    }

    #[test]
    fn test_item_subjects_pass_through() {
        let filter = OwnItemsFilter::new(Arc::new(AffinityIndex::new()));
        let context = RecContext::for_item("alice/lib");

        let candidates = vec![ScoredItem::new("alice/other", 0.9)];
        assert_eq!(filter.apply(candidates, &context).unwrap().len(), 1);
    }
}
