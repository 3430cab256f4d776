//! Recommendation emission: neighborhoods and affinities in, ranked lists out.
//!
//! ## Lists
//! - **item recs**: each anchor's neighborhood through the filter chain
//! - **user specific**: `score[j] = Σ_i specific(u, i) × sim(i, j)`
//! - **user general**: same over general interest, plus a popularity prior
//!   for users whose specific history is sparse
//!
//! Every list is filtered, ranked (score descending, item id ascending) and
//! truncated to `max_recs`. Subjects with nothing to score get an empty list.

use crate::context::RecContext;
use crate::filter_pipeline::FilterPipeline;
use crate::filters::{AlreadyInteractedFilter, MinimumPopularityFilter, OwnItemsFilter};
use crate::popularity::PopularityTable;
use crate::traits::Filter;
use anyhow::Result;
use data_loader::{
    AffinityIndex, InterestDimension, ItemId, ItemNeighborhood, Recommendation, ScoredItem, UserId,
    rank_and_truncate,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Tuning knobs for recommendation emission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Maximum list length for every subject
    pub max_recs: usize,
    /// Users with fewer positive specific items than this get the popularity prior
    pub cold_start_min_items: usize,
    pub popularity_weight: f64,
    /// How many of the most popular items the prior is spread over
    pub popular_items: usize,
    /// Watcher threshold of `MinimumPopularityFilter` (0 disables it)
    pub min_watchers: u32,
    /// Whether users are shown repositories they own
    pub exclude_own_items: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            max_recs: 10,
            cold_start_min_items: 2,
            popularity_weight: 0.1,
            popular_items: 100,
            min_watchers: 0,
            exclude_own_items: true,
        }
    }
}

/// Emits item-level and user-level recommendation lists
pub struct RecommendationEmitter {
    index: Arc<AffinityIndex>,
    neighborhoods: HashMap<ItemId, Vec<ScoredItem>>,
    popularity: PopularityTable,
    filters: FilterPipeline,
    config: RecommendConfig,
}

impl RecommendationEmitter {
    /// Create an emitter with the filter chain described by `config`
    pub fn new(
        index: Arc<AffinityIndex>,
        neighborhoods: Vec<ItemNeighborhood>,
        config: RecommendConfig,
    ) -> Self {
        let mut filters = FilterPipeline::new().add_filter(AlreadyInteractedFilter);
        if config.exclude_own_items {
            filters = filters.add_filter(OwnItemsFilter::new(index.clone()));
        }
        if config.min_watchers > 0 {
            filters = filters.add_filter(MinimumPopularityFilter::new(index.clone(), config.min_watchers));
        }

        let popularity = PopularityTable::from_index(&index);
        let neighborhoods = neighborhoods
            .into_iter()
            .map(|n| (n.anchor_item_id, n.neighbors))
            .collect();

        Self {
            index,
            neighborhoods,
            popularity,
            filters,
            config,
        }
    }

    /// Append an extra filter to the chain
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters = self.filters.add_filter(filter);
        self
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.filter_names()
    }

    /// Recommendations for one anchor item
    pub fn recommend_for_item(&self, item_id: &str) -> Result<Recommendation> {
        let context = RecContext::for_item(item_id);
        let candidates = self.neighborhoods.get(item_id).cloned().unwrap_or_default();
        self.finish(candidates, &context)
    }

    /// One list per anchor with a neighborhood, sorted by anchor id
    #[instrument(skip(self))]
    pub fn item_recs(&self) -> Result<Vec<Recommendation>> {
        let mut anchors: Vec<&ItemId> = self.neighborhoods.keys().collect();
        anchors.sort();

        let recs: Vec<Recommendation> = anchors
            .into_par_iter()
            .map(|anchor| self.recommend_for_item(anchor))
            .collect::<Result<_>>()?;

        info!("Emitted {} item recommendation lists", recs.len());
        Ok(recs)
    }

    /// Recommendations for one user along one interest dimension.
    ///
    /// Only `Specific` and `General` carry user lists; `Graph` yields an
    /// empty list.
    pub fn recommend_for_user(
        &self,
        user_id: &str,
        dimension: InterestDimension,
    ) -> Result<Recommendation> {
        let context = RecContext::for_user(&self.index, user_id);
        let interests = context.interests(dimension);

        let mut scores: HashMap<&str, f64> = HashMap::new();
        for (item_id, weight) in interests {
            let Some(neighbors) = self.neighborhoods.get(item_id) else {
                continue;
            };
            for neighbor in neighbors {
                *scores.entry(neighbor.item_id.as_str()).or_insert(0.0) += weight * neighbor.score;
            }
        }

        if dimension == InterestDimension::General && self.is_cold_start(&context) {
            for popular in self.popularity.top(self.config.popular_items) {
                *scores.entry(popular.item_id.as_str()).or_insert(0.0) +=
                    self.config.popularity_weight * popular.score;
            }
        }

        let candidates: Vec<ScoredItem> = scores
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(item_id, score)| ScoredItem::new(item_id, score))
            .collect();
        self.finish(candidates, &context)
    }

    /// Sparse specific history but at least one general affinity
    fn is_cold_start(&self, context: &RecContext) -> bool {
        context.specific_interests.len() < self.config.cold_start_min_items
            && !context.general_interests.is_empty()
    }

    /// One list per requested user, in the order given
    #[instrument(skip(self, user_ids), fields(users = user_ids.len()))]
    pub fn user_recs(
        &self,
        user_ids: &[UserId],
        dimension: InterestDimension,
    ) -> Result<Vec<Recommendation>> {
        let recs: Vec<Recommendation> = user_ids
            .par_iter()
            .map(|user_id| self.recommend_for_user(user_id, dimension))
            .collect::<Result<_>>()?;

        let non_empty = recs.iter().filter(|r| !r.is_empty()).count();
        info!(
            "Emitted {:?} recommendations for {} users ({} non-empty)",
            dimension,
            recs.len(),
            non_empty
        );
        Ok(recs)
    }

    pub fn user_specific_recs(&self, user_ids: &[UserId]) -> Result<Vec<Recommendation>> {
        self.user_recs(user_ids, InterestDimension::Specific)
    }

    pub fn user_general_recs(&self, user_ids: &[UserId]) -> Result<Vec<Recommendation>> {
        self.user_recs(user_ids, InterestDimension::General)
    }

    fn finish(&self, candidates: Vec<ScoredItem>, context: &RecContext) -> Result<Recommendation> {
        let mut items = self.filters.apply(candidates, context)?;
        rank_and_truncate(&mut items, self.config.max_recs);
        Ok(Recommendation {
            subject_id: context.subject_id.clone(),
            items,
        })
    }
}
