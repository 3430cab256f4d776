//! Affinity aggregation: events in, one scaled affinity per (user, item).
//!
//! ## Algorithm
//! 1. Value every event (`value_event`)
//! 2. Sum the weight vectors per (user, item) pair
//! 3. Scale each dimension of each sum (`logistic_scale`)
//!
//! The summation runs as a rayon fold/reduce: each worker folds a slice of
//! the events into a local map and the maps are merged pairwise. Addition is
//! commutative, so the result does not depend on how events were split.

use crate::error::{Result, ScoringError};
use crate::scaling::scale_vector;
use crate::valuation::{WeightVector, value_event};
use data_loader::{Affinity, Event, ItemId, UserId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// What to do with an event whose type cannot be valued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidEventPolicy {
    /// Abort the whole batch on the first invalid event
    #[default]
    Abort,
    /// Skip the record, log it and count it
    SkipAndLog,
}

/// Counters reported by one aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationStats {
    pub events: usize,
    pub skipped: usize,
    pub pairs: usize,
}

type PairSums = HashMap<(UserId, ItemId), WeightVector>;

/// Groups events by (user, item) and produces scaled affinities
#[derive(Debug, Clone, Default)]
pub struct AffinityAggregator {
    invalid_event_policy: InvalidEventPolicy,
}

impl AffinityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure how invalid event types are handled (default: abort)
    pub fn with_invalid_event_policy(mut self, policy: InvalidEventPolicy) -> Self {
        self.invalid_event_policy = policy;
        self
    }

    /// Sum raw weight vectors per (user, item) pair.
    ///
    /// Returns the unscaled sums and the number of skipped events.
    pub fn accumulate(&self, events: &[Event]) -> Result<(PairSums, usize)> {
        let policy = self.invalid_event_policy;

        events
            .par_iter()
            .try_fold(
                || (PairSums::new(), 0usize),
                |(mut sums, mut skipped), event| {
                    match value_event(&event.event_type) {
                        Ok(weights) => {
                            *sums
                                .entry((event.user_id.clone(), event.item_id.clone()))
                                .or_default() += weights;
                        }
                        Err(err) => match policy {
                            InvalidEventPolicy::Abort => return Err(err),
                            InvalidEventPolicy::SkipAndLog => {
                                warn!(
                                    user_id = %event.user_id,
                                    item_id = %event.item_id,
                                    "Skipping event: {}",
                                    err
                                );
                                skipped += 1;
                            }
                        },
                    }
                    Ok::<_, ScoringError>((sums, skipped))
                },
            )
            .try_reduce(
                || (PairSums::new(), 0usize),
                |(mut acc, acc_skipped), (local, local_skipped)| {
                    for (pair, weights) in local {
                        *acc.entry(pair).or_default() += weights;
                    }
                    Ok((acc, acc_skipped + local_skipped))
                },
            )
    }

    /// Aggregate events into scaled affinities, sorted by (user, item)
    #[instrument(skip_all, fields(events = events.len()))]
    pub fn aggregate(&self, events: &[Event]) -> Result<(Vec<Affinity>, AggregationStats)> {
        let (sums, skipped) = self.accumulate(events)?;

        let mut affinities: Vec<Affinity> = sums
            .into_par_iter()
            .map(|((user_id, item_id), raw)| to_affinity(user_id, item_id, raw))
            .collect();
        affinities.par_sort_unstable_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });

        let stats = AggregationStats {
            events: events.len(),
            skipped,
            pairs: affinities.len(),
        };
        info!(
            "Aggregated {} events into {} affinities ({} skipped)",
            stats.events, stats.pairs, stats.skipped
        );
        Ok((affinities, stats))
    }
}

/// Scale a summed weight vector into an affinity row
pub fn to_affinity(user_id: UserId, item_id: ItemId, raw: WeightVector) -> Affinity {
    let scaled = scale_vector(raw);
    Affinity {
        user_id,
        item_id,
        specific_interest: scaled.specific_interest,
        general_interest: scaled.general_interest,
        graph_score: scaled.graph_score,
    }
}
