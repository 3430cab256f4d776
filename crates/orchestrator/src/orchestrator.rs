//! # Pipeline Orchestrator
//!
//! This module coordinates the three batch stages:
//! 1. `extract_events`: event logs → ids, gravatar ids, affinities, metadata
//! 2. `gen_item_recs`: affinities + metadata → neighborhoods, item recs
//! 3. `gen_user_recs`: affinities + neighborhoods → user specific/general recs
//!
//! Stages run strictly in sequence. Before a stage starts its declared input
//! datasets must exist; any error inside a stage is wrapped in
//! `StageFailure` and stops the run. A stage's outputs are committed
//! together through one `DatasetBatch`, so a failed stage replaces none of
//! them.
//!
//! CPU-bound work runs on `spawn_blocking` tasks inside a dedicated rayon
//! pool sized by the configured parallelism. In `gen_user_recs` the specific
//! and general lists are computed concurrently with `tokio::join!`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use tracing::{info, warn};

use data_loader::files::load_event_logs;
use data_loader::{AffinityIndex, DatasetBatch, ItemNeighborhood, Recommendation, parser};
use neighborhoods::ItemNeighborhoodBuilder;
use recommend::RecommendationEmitter;
use scoring::{AffinityAggregator, distinct_ids, split_records};

use crate::config::PipelineConfig;
use crate::error::{OrchestratorError, Result};
use crate::stages::{Dataset, Stage};

/// Outcome of one stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub elapsed: Duration,
    /// Rows written per output dataset
    pub rows: Vec<(Dataset, usize)>,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }
}

/// Item-level results of `gen_item_recs`
#[derive(Debug, Clone)]
pub struct ItemRecs {
    pub neighborhoods: Vec<ItemNeighborhood>,
    pub recs: Vec<Recommendation>,
}

/// User-level results of `gen_user_recs`, one entry per user id
#[derive(Debug, Clone)]
pub struct UserRecs {
    pub specific: Vec<Recommendation>,
    pub general: Vec<Recommendation>,
}

/// Sequences the stages and binds them to their datasets
#[derive(Clone)]
pub struct PipelineOrchestrator {
    config: Arc<PipelineConfig>,
    pool: Arc<rayon::ThreadPool>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator with its own worker pool
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism)
            .thread_name(|i| format!("gh-recs-worker-{}", i))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order, stopping at the first failure
    pub async fn run(&self) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();
        for stage in Stage::ALL {
            report.stages.push(self.run_stage(stage).await?);
        }
        info!(
            "Pipeline finished {} stages in {:.2?}",
            report.stages.len(),
            report.elapsed()
        );
        Ok(report)
    }

    /// Run a single stage whose inputs already exist
    pub async fn run_stage(&self, stage: Stage) -> Result<StageReport> {
        self.check_inputs(stage)?;

        info!("{}: {}", stage, stage.description());
        let start_time = Instant::now();

        let rows = match stage {
            Stage::ExtractEvents => self.extract_events().await,
            Stage::GenItemRecs => self.gen_item_recs().await,
            Stage::GenUserRecs => self.gen_user_recs().await,
        }
        .map_err(|e| OrchestratorError::stage_failure(stage, e))?;

        let elapsed = start_time.elapsed();
        for (dataset, count) in &rows {
            info!("{}: wrote {} rows to {}", stage, count, dataset);
        }
        info!("{} finished in {:.2?}", stage, elapsed);

        Ok(StageReport {
            stage,
            elapsed,
            rows,
        })
    }

    /// Fail with `MissingInput` if any declared input dataset is absent
    pub fn check_inputs(&self, stage: Stage) -> Result<()> {
        for &dataset in stage.inputs() {
            let path = self.config.dataset_path(dataset);
            if !path.is_file() {
                return Err(OrchestratorError::MissingInput {
                    stage,
                    dataset,
                    path,
                });
            }
        }
        Ok(())
    }

    /// Read a recommendation dataset written by an earlier run
    pub fn read_recommendations(&self, dataset: Dataset) -> anyhow::Result<Vec<Recommendation>> {
        let path = self.config.dataset_path(dataset);
        parser::parse_recommendations(&path)
            .with_context(|| format!("Failed to read {} from {}", dataset, path.display()))
    }

    /// Run a closure on the worker pool without blocking the async runtime
    async fn blocking<T, F>(&self, task: &'static str, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&PipelineOrchestrator) -> anyhow::Result<T> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.pool.install(|| f(&this)))
            .await
            .with_context(|| format!("{} task panicked", task))?
    }

    // =========================================================================
    // extract_events
    // =========================================================================

    async fn extract_events(&self) -> anyhow::Result<Vec<(Dataset, usize)>> {
        self.blocking("extract_events", |this| this.extract_events_blocking())
            .await
    }

    fn extract_events_blocking(&self) -> anyhow::Result<Vec<(Dataset, usize)>> {
        let config = &self.config;

        let records = load_event_logs(&config.root, &config.events)
            .with_context(|| format!("Failed to load event logs matching {}", config.events))?;

        let (events, mut facts) = split_records(records);
        let (affinities, stats) = AffinityAggregator::new()
            .with_invalid_event_policy(config.invalid_event_policy)
            .aggregate(&events)?;
        if stats.skipped > 0 {
            warn!("Skipped {} events with invalid types", stats.skipped);
        }

        let (user_ids, item_ids) = distinct_ids(&affinities);
        facts.retain_items(&item_ids);
        facts.retain_users(&user_ids);

        let mut batch = DatasetBatch::new();
        batch.write_ids(&config.dataset_path(Dataset::UserIds), &user_ids)?;
        batch.write_ids(&config.dataset_path(Dataset::ItemIds), &item_ids)?;
        batch.write_gravatar_ids(
            &config.dataset_path(Dataset::UserGravatarIds),
            &facts.gravatar_ids,
        )?;
        batch.write_affinities(&config.dataset_path(Dataset::UserItemAffinities), &affinities)?;
        batch.write_metadata(&config.dataset_path(Dataset::ItemMetadata), &facts.metadata)?;
        batch.commit()?;

        Ok(vec![
            (Dataset::UserIds, user_ids.len()),
            (Dataset::ItemIds, item_ids.len()),
            (Dataset::UserGravatarIds, facts.gravatar_ids.len()),
            (Dataset::UserItemAffinities, affinities.len()),
            (Dataset::ItemMetadata, facts.metadata.len()),
        ])
    }

    // =========================================================================
    // gen_item_recs
    // =========================================================================

    /// Build neighborhoods and item recommendations from the extracted datasets
    pub async fn compute_item_recs(&self) -> anyhow::Result<ItemRecs> {
        self.blocking("gen_item_recs", |this| {
            let index = Arc::new(this.load_index()?);
            this.check_item_ids(&index)?;

            let neighborhoods =
                ItemNeighborhoodBuilder::from_config(index.clone(), &this.config.neighborhoods)
                    .build();
            let emitter = RecommendationEmitter::new(
                index,
                neighborhoods.clone(),
                this.config.recommend.clone(),
            );
            let recs = emitter.item_recs()?;
            Ok(ItemRecs {
                neighborhoods,
                recs,
            })
        })
        .await
    }

    async fn gen_item_recs(&self) -> anyhow::Result<Vec<(Dataset, usize)>> {
        let ItemRecs {
            neighborhoods,
            recs,
        } = self.compute_item_recs().await?;

        let mut batch = DatasetBatch::new();
        batch.write_neighborhoods(
            &self.config.dataset_path(Dataset::ItemNeighborhoods),
            &neighborhoods,
        )?;
        batch.write_recommendations(&self.config.dataset_path(Dataset::ItemRecs), &recs)?;
        batch.commit()?;

        Ok(vec![
            (
                Dataset::ItemNeighborhoods,
                neighborhoods.iter().map(|n| n.neighbors.len().max(1)).sum(),
            ),
            (Dataset::ItemRecs, row_count(&recs)),
        ])
    }

    // =========================================================================
    // gen_user_recs
    // =========================================================================

    /// Build both user lists for every id in `user_ids`
    pub async fn compute_user_recs(&self) -> anyhow::Result<UserRecs> {
        let (emitter, user_ids) = self
            .blocking("load user inputs", |this| {
                let (index, rest) = rayon::join(
                    || this.load_index(),
                    || {
                        let user_ids = parser::parse_ids(&this.config.dataset_path(Dataset::UserIds))?;
                        let neighborhoods = parser::parse_neighborhoods(
                            &this.config.dataset_path(Dataset::ItemNeighborhoods),
                        )?;
                        Ok::<_, data_loader::DataLoadError>((user_ids, neighborhoods))
                    },
                );
                let index = Arc::new(index?);
                let (user_ids, neighborhoods) = rest?;
                this.check_item_ids(&index)?;

                let emitter =
                    RecommendationEmitter::new(index, neighborhoods, this.config.recommend.clone());
                Ok((Arc::new(emitter), Arc::new(user_ids)))
            })
            .await?;

        let (specific, general) = tokio::join!(
            tokio::task::spawn_blocking({
                let emitter = emitter.clone();
                let user_ids = user_ids.clone();
                let pool = self.pool.clone();
                move || pool.install(|| emitter.user_specific_recs(&user_ids))
            }),
            tokio::task::spawn_blocking({
                let emitter = emitter.clone();
                let user_ids = user_ids.clone();
                let pool = self.pool.clone();
                move || pool.install(|| emitter.user_general_recs(&user_ids))
            })
        );

        let specific = specific.context("Specific-interest task panicked")??;
        let general = general.context("General-interest task panicked")??;
        Ok(UserRecs { specific, general })
    }

    async fn gen_user_recs(&self) -> anyhow::Result<Vec<(Dataset, usize)>> {
        let UserRecs { specific, general } = self.compute_user_recs().await?;

        let mut batch = DatasetBatch::new();
        batch.write_recommendations(
            &self.config.dataset_path(Dataset::UserSpecificRecs),
            &specific,
        )?;
        batch.write_recommendations(
            &self.config.dataset_path(Dataset::UserGeneralRecs),
            &general,
        )?;
        batch.commit()?;

        Ok(vec![
            (Dataset::UserSpecificRecs, row_count(&specific)),
            (Dataset::UserGeneralRecs, row_count(&general)),
        ])
    }

    // =========================================================================
    // Shared inputs
    // =========================================================================

    fn load_index(&self) -> anyhow::Result<AffinityIndex> {
        let index = AffinityIndex::load_from_files(
            &self.config.dataset_path(Dataset::UserItemAffinities),
            &self.config.dataset_path(Dataset::ItemMetadata),
        )
        .context("Failed to load the affinity index")?;
        let (users, items, affinities) = index.counts();
        info!(
            "Loaded affinity index: {} users, {} items, {} affinities",
            users, items, affinities
        );
        Ok(index)
    }

    /// `item_ids` must list exactly the items of the affinity dataset
    fn check_item_ids(&self, index: &AffinityIndex) -> anyhow::Result<()> {
        let item_ids = parser::parse_ids(&self.config.dataset_path(Dataset::ItemIds))?;
        if item_ids != index.item_ids() {
            return Err(anyhow!(
                "{} lists {} items but {} has {}; re-run extract_events",
                Dataset::ItemIds,
                item_ids.len(),
                Dataset::UserItemAffinities,
                index.item_ids().len()
            ));
        }
        Ok(())
    }
}

/// Rows a list of recommendations occupies on disk
fn row_count(recs: &[Recommendation]) -> usize {
    recs.iter().map(|r| r.items.len().max(1)).sum()
}

