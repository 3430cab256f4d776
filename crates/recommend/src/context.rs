//! Per-subject context for candidate scoring and filtering.
//!
//! A context is gathered once per subject, so the scoring loop and every
//! filter can work from HashSet lookups instead of querying the index again.

use data_loader::{AffinityIndex, InterestDimension, ItemId};
use std::collections::HashSet;

/// Who a recommendation list is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    User,
    Item,
}

/// Everything the emitter and the filters need to know about one subject
#[derive(Debug, Clone)]
pub struct RecContext {
    pub subject_id: String,
    pub kind: SubjectKind,
    /// Items the subject must never be recommended
    pub interacted_items: HashSet<ItemId>,
    /// Items with positive specific interest and their weights
    pub specific_interests: Vec<(ItemId, f64)>,
    /// Items with positive general interest and their weights
    pub general_interests: Vec<(ItemId, f64)>,
}

impl RecContext {
    /// Context for an anchor item: only the anchor itself is excluded
    pub fn for_item(item_id: &str) -> Self {
        Self {
            subject_id: item_id.to_string(),
            kind: SubjectKind::Item,
            interacted_items: HashSet::from([item_id.to_string()]),
            specific_interests: Vec::new(),
            general_interests: Vec::new(),
        }
    }

    /// Gather a user's affinity history.
    ///
    /// Unknown users get an empty context, which later yields empty lists.
    pub fn for_user(index: &AffinityIndex, user_id: &str) -> Self {
        let mut context = Self {
            subject_id: user_id.to_string(),
            kind: SubjectKind::User,
            interacted_items: HashSet::new(),
            specific_interests: Vec::new(),
            general_interests: Vec::new(),
        };

        for affinity in index.get_user_affinities(user_id) {
            context.interacted_items.insert(affinity.item_id.clone());
            if affinity.specific_interest > 0.0 {
                context
                    .specific_interests
                    .push((affinity.item_id.clone(), affinity.specific_interest));
            }
            if affinity.general_interest > 0.0 {
                context
                    .general_interests
                    .push((affinity.item_id.clone(), affinity.general_interest));
            }
        }
        context
    }

    /// Weighted items of one interest dimension
    pub fn interests(&self, dimension: InterestDimension) -> &[(ItemId, f64)] {
        match dimension {
            InterestDimension::Specific => &self.specific_interests,
            InterestDimension::General => &self.general_interests,
            InterestDimension::Graph => &[],
        }
    }
}
