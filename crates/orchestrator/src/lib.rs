//! Orchestrator crate for the repository recommender.
//!
//! This crate owns the pipeline configuration and the orchestrator that
//! runs the `extract_events`, `gen_item_recs` and `gen_user_recs` stages.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod stages;

pub use config::{DatasetLocations, DatasetNames, PipelineConfig, PipelineConfigBuilder};
pub use error::{ConfigError, OrchestratorError, Result};
pub use orchestrator::{ItemRecs, PipelineOrchestrator, PipelineReport, StageReport, UserRecs};
pub use stages::{Dataset, Stage};
