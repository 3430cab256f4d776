//! Side facts pulled out of the event records during extraction.
//!
//! Besides the affinities, the extract stage produces:
//! - one metadata snapshot per repository (the freshest one wins)
//! - one gravatar id per user (the most recent non-empty one wins)
//! - the sorted, de-duplicated user and item id lists

use chrono::{DateTime, FixedOffset};
use data_loader::{Affinity, Event, EventRecord, ItemId, ItemMetadata, UserId};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Metadata and gravatar ids collected from a batch of records
#[derive(Debug, Clone, Default)]
pub struct SideFacts {
    pub metadata: Vec<ItemMetadata>,
    pub gravatar_ids: Vec<(UserId, String)>,
}

impl SideFacts {
    /// Keep only metadata for items that ended up with an affinity
    pub fn retain_items(&mut self, item_ids: &[ItemId]) {
        let keep: HashSet<&str> = item_ids.iter().map(|s| s.as_str()).collect();
        self.metadata.retain(|m| keep.contains(m.item_id.as_str()));
    }

    /// Keep only gravatar ids of users that ended up with an affinity
    pub fn retain_users(&mut self, user_ids: &[UserId]) {
        let keep: HashSet<&str> = user_ids.iter().map(|s| s.as_str()).collect();
        self.gravatar_ids.retain(|(user, _)| keep.contains(user.as_str()));
    }
}

/// Split parsed records into the event stream and the side facts
pub fn split_records(records: Vec<EventRecord>) -> (Vec<Event>, SideFacts) {
    let mut events = Vec::with_capacity(records.len());
    let mut metadata: HashMap<ItemId, ItemMetadata> = HashMap::new();
    let mut gravatars: HashMap<UserId, (String, DateTime<FixedOffset>)> = HashMap::new();

    for record in records {
        metadata
            .entry(record.metadata.item_id.clone())
            .and_modify(|existing| {
                if record.metadata.freshness_cmp(existing) == Ordering::Greater {
                    *existing = record.metadata.clone();
                }
            })
            .or_insert_with(|| record.metadata.clone());

        if let Some(gravatar_id) = record.gravatar_id {
            gravatars
                .entry(record.event.user_id.clone())
                .and_modify(|(existing_id, seen_at)| {
                    let newer = record
                        .event
                        .timestamp
                        .cmp(seen_at)
                        .then_with(|| gravatar_id.cmp(existing_id));
                    if newer == Ordering::Greater {
                        *existing_id = gravatar_id.clone();
                        *seen_at = record.event.timestamp;
                    }
                })
                .or_insert_with(|| (gravatar_id.clone(), record.event.timestamp));
        }

        events.push(record.event);
    }

    let mut metadata: Vec<ItemMetadata> = metadata.into_values().collect();
    metadata.sort_by(|a, b| a.item_id.cmp(&b.item_id));

    let mut gravatar_ids: Vec<(UserId, String)> = gravatars
        .into_iter()
        .map(|(user, (gravatar_id, _))| (user, gravatar_id))
        .collect();
    gravatar_ids.sort();

    (
        events,
        SideFacts {
            metadata,
            gravatar_ids,
        },
    )
}

/// Sorted, de-duplicated user and item ids of a set of affinities
pub fn distinct_ids(affinities: &[Affinity]) -> (Vec<UserId>, Vec<ItemId>) {
    let users: BTreeSet<&UserId> = affinities.iter().map(|a| &a.user_id).collect();
    let items: BTreeSet<&ItemId> = affinities.iter().map(|a| &a.item_id).collect();
    (
        users.into_iter().cloned().collect(),
        items.into_iter().cloned().collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, item: &str, at: &str, watchers: u32, gravatar: Option<&str>) -> EventRecord {
        let timestamp = DateTime::parse_from_rfc3339(at).unwrap();
        let (owner, name) = item.split_once('/').unwrap();
        EventRecord {
            event: Event {
                user_id: user.to_string(),
                item_id: item.to_string(),
                event_type: "WatchEvent".to_string(),
                timestamp,
            },
            metadata: ItemMetadata {
                item_id: item.to_string(),
                owner: owner.to_string(),
                name: name.to_string(),
                language: None,
                description: None,
                watchers,
                forks: 0,
                timestamp,
            },
            gravatar_id: gravatar.map(|g| g.to_string()),
        }
    }

    #[test]
    fn test_freshest_metadata_wins() {
        let records = vec![
            record("u1", "o/r", "2012-03-11T10:00:00Z", 10, None),
            record("u2", "o/r", "2012-03-12T10:00:00Z", 12, None),
            record("u3", "o/r", "2012-03-10T10:00:00Z", 99, None),
        ];

        let (events, facts) = split_records(records);
        assert_eq!(events.len(), 3);
        assert_eq!(facts.metadata.len(), 1);
        assert_eq!(facts.metadata[0].watchers, 12);
    }

    #[test]
    fn test_latest_gravatar_wins() {
        let records = vec![
            record("u1", "o/a", "2012-03-12T10:00:00Z", 1, Some("new")),
            record("u1", "o/b", "2012-03-11T10:00:00Z", 1, Some("old")),
            record("u1", "o/c", "2012-03-13T10:00:00Z", 1, None),
            record("u2", "o/a", "2012-03-11T10:00:00Z", 1, None),
        ];

        let (_, facts) = split_records(records);
        assert_eq!(facts.gravatar_ids, vec![("u1".to_string(), "new".to_string())]);
    }

    #[test]
    fn test_retain_drops_unreferenced_facts() {
        let records = vec![
            record("u1", "o/a", "2012-03-12T10:00:00Z", 1, Some("g1")),
            record("u2", "o/b", "2012-03-12T10:00:00Z", 1, Some("g2")),
        ];
        let (_, mut facts) = split_records(records);

        facts.retain_items(&["o/a".to_string()]);
        facts.retain_users(&["u2".to_string()]);

        assert_eq!(facts.metadata.len(), 1);
        assert_eq!(facts.metadata[0].item_id, "o/a");
        assert_eq!(facts.gravatar_ids, vec![("u2".to_string(), "g2".to_string())]);
    }

    #[test]
    fn test_distinct_ids_are_sorted() {
        let affinity = |u: &str, i: &str| Affinity {
            user_id: u.to_string(),
            item_id: i.to_string(),
            specific_interest: 0.0,
            general_interest: 0.0,
            graph_score: 0.1,
        };
        let (users, items) = distinct_ids(&[
            affinity("u2", "o/b"),
            affinity("u1", "o/b"),
            affinity("u1", "o/a"),
        ]);
        assert_eq!(users, vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(items, vec!["o/a".to_string(), "o/b".to_string()]);
    }
}
