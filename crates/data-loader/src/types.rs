//! Core domain types for repository-activity recommendations.
//!
//! This module defines the records that flow between pipeline stages:
//! - Raw events as they come out of the activity logs
//! - Item metadata extracted from those events
//! - Scaled user-item affinities
//! - Item neighborhoods and ranked recommendation lists
//!
//! Key Rust concepts demonstrated here:
//! - Type aliases for domain clarity (UserId, ItemId)
//! - Total ordering over floats with `f64::total_cmp`
//! - HashMap-backed indices for O(1) lookups

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user (the actor login in the event logs)
pub type UserId = String;

/// Unique identifier for an item (a repository, written `owner/name`)
pub type ItemId = String;

// =============================================================================
// Raw Events
// =============================================================================

/// A single user-item interaction taken from the raw event logs.
///
/// `event_type` is kept exactly as it appeared in the log. It is only
/// interpreted when the event is valued, so an unknown type surfaces as an
/// error at that point instead of being dropped while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub event_type: String,
    pub timestamp: DateTime<FixedOffset>,
}

/// One parsed line of an event log: the event plus the side facts the
/// extract stage pulls out of the same record.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: Event,
    /// Snapshot of the repository as seen by this event
    pub metadata: ItemMetadata,
    /// Gravatar id of the actor, when the log carries one
    pub gravatar_id: Option<String>,
}

// =============================================================================
// Item Metadata
// =============================================================================

/// Descriptive attributes of a repository, used for display and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub item_id: ItemId,
    pub owner: String,
    pub name: String,
    pub language: Option<String>,
    pub description: Option<String>,
    pub watchers: u32,
    pub forks: u32,
    /// Timestamp of the event this snapshot was taken from
    pub timestamp: DateTime<FixedOffset>,
}

impl ItemMetadata {
    /// Ordering used to pick one snapshot per item: the most recent wins,
    /// then the larger watcher count, then the description.
    pub fn freshness_cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.watchers.cmp(&other.watchers))
            .then_with(|| self.description.cmp(&other.description))
    }
}

// =============================================================================
// Affinities
// =============================================================================

/// The three interest dimensions carried by every affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterestDimension {
    /// Interest in this particular repository (pushes, pull requests)
    Specific,
    /// Interest in repositories like this one (forks, watches)
    General,
    /// Weight of the user-item edge in the co-occurrence graph
    Graph,
}

/// Scaled strength of interest between one user and one item.
///
/// Every field lies in the open interval (-1, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affinity {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub specific_interest: f64,
    pub general_interest: f64,
    pub graph_score: f64,
}

impl Affinity {
    /// Read one dimension of the affinity
    pub fn dimension(&self, dimension: InterestDimension) -> f64 {
        match dimension {
            InterestDimension::Specific => self.specific_interest,
            InterestDimension::General => self.general_interest,
            InterestDimension::Graph => self.graph_score,
        }
    }
}

// =============================================================================
// Ranked Outputs
// =============================================================================

/// An item paired with a score, the element of every ranked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
}

impl ScoredItem {
    pub fn new(item_id: impl Into<ItemId>, score: f64) -> Self {
        Self {
            item_id: item_id.into(),
            score,
        }
    }

    /// Ranking order: score descending, ties by item id ascending.
    ///
    /// `total_cmp` gives a total order even when a NaN sneaks in, so sorting
    /// never depends on input order.
    pub fn ranking_cmp(a: &Self, b: &Self) -> Ordering {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    }
}

/// Sort a list into ranking order and keep at most `limit` entries
pub fn rank_and_truncate(items: &mut Vec<ScoredItem>, limit: usize) {
    items.sort_by(ScoredItem::ranking_cmp);
    items.truncate(limit);
}

/// Ranked list of items similar to an anchor item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemNeighborhood {
    pub anchor_item_id: ItemId,
    pub neighbors: Vec<ScoredItem>,
}

/// Ranked recommendations for one subject (an item or a user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub subject_id: String,
    pub items: Vec<ScoredItem>,
}

impl Recommendation {
    pub fn empty(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// AffinityIndex - The In-Memory View of the Extracted Datasets
// =============================================================================

/// Holds affinities and metadata with per-user and per-item lookups.
///
/// Later stages only ever read from the index, so it is built once and then
/// shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct AffinityIndex {
    /// All affinities made by each user
    pub(crate) user_affinities: HashMap<UserId, Vec<Affinity>>,
    /// All affinities received by each item
    pub(crate) item_affinities: HashMap<ItemId, Vec<Affinity>>,
    pub(crate) metadata: HashMap<ItemId, ItemMetadata>,
    pub(crate) gravatar_ids: HashMap<UserId, String>,
}

impl AffinityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all affinities of a user (empty slice for unknown users)
    pub fn get_user_affinities(&self, user_id: &str) -> &[Affinity] {
        self.user_affinities
            .get(user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get all affinities received by an item
    pub fn get_item_affinities(&self, item_id: &str) -> &[Affinity] {
        self.item_affinities
            .get(item_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_metadata(&self, item_id: &str) -> Option<&ItemMetadata> {
        self.metadata.get(item_id)
    }

    pub fn get_gravatar_id(&self, user_id: &str) -> Option<&str> {
        self.gravatar_ids.get(user_id).map(|s| s.as_str())
    }

    /// True when any metadata has been loaded
    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// All users with at least one affinity, sorted
    pub fn user_ids(&self) -> Vec<UserId> {
        let ids: BTreeSet<&UserId> = self.user_affinities.keys().collect();
        ids.into_iter().cloned().collect()
    }

    /// All items with at least one affinity, sorted
    pub fn item_ids(&self) -> Vec<ItemId> {
        let ids: BTreeSet<&ItemId> = self.item_affinities.keys().collect();
        ids.into_iter().cloned().collect()
    }

    /// Iterate over every affinity once
    pub fn affinities(&self) -> impl Iterator<Item = &Affinity> {
        self.user_affinities.values().flatten()
    }

    /// Insert an affinity and update both lookups
    pub fn insert_affinity(&mut self, affinity: Affinity) {
        self.item_affinities
            .entry(affinity.item_id.clone())
            .or_default()
            .push(affinity.clone());
        self.user_affinities
            .entry(affinity.user_id.clone())
            .or_default()
            .push(affinity);
    }

    pub fn insert_metadata(&mut self, metadata: ItemMetadata) {
        self.metadata.insert(metadata.item_id.clone(), metadata);
    }

    pub fn insert_gravatar_id(&mut self, user_id: UserId, gravatar_id: String) {
        self.gravatar_ids.insert(user_id, gravatar_id);
    }

    /// (users, items, affinities) counts for logging and validation
    pub fn counts(&self) -> (usize, usize, usize) {
        let total = self.user_affinities.values().map(|v| v.len()).sum();
        (self.user_affinities.len(), self.item_affinities.len(), total)
    }
}
