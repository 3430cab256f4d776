//! Error types for configuration and stage execution.

use crate::stages::{Dataset, Stage};
use std::path::PathBuf;
use thiserror::Error;

/// Problems found while assembling a `PipelineConfig`
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting was never provided
    #[error("Missing configuration: {0}")]
    MissingConfiguration(&'static str),

    /// A setting was provided but cannot be used
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors reported by the orchestrator
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A declared input dataset does not exist yet
    #[error("Stage {stage} is missing input {dataset} at {path}")]
    MissingInput {
        stage: Stage,
        dataset: Dataset,
        path: PathBuf,
    },

    /// Anything that failed inside a stage; later stages are not attempted
    #[error("Stage {stage} failed: {source}")]
    StageFailure {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl OrchestratorError {
    /// Wrap any stage-internal error
    pub fn stage_failure(stage: Stage, source: anyhow::Error) -> Self {
        OrchestratorError::StageFailure {
            stage,
            source: source.into(),
        }
    }

    /// The stage this error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            OrchestratorError::MissingInput { stage, .. }
            | OrchestratorError::StageFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, OrchestratorError>;
