//! Pipeline configuration.
//!
//! Settings are collected into a [`PipelineConfigBuilder`] from a JSON file
//! and from command-line flags or environment variables, then validated once
//! by [`PipelineConfigBuilder::build`]. The resulting [`PipelineConfig`] is
//! immutable and shared by every stage.

use crate::error::ConfigError;
use crate::stages::Dataset;
use neighborhoods::NeighborhoodConfig;
use recommend::RecommendConfig;
use scoring::InvalidEventPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names of the datasets, relative to the root path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetNames {
    pub user_ids: String,
    pub item_ids: String,
    pub user_gravatar_ids: String,
    pub user_item_affinities: String,
    pub item_metadata: String,
    pub item_neighborhoods: String,
    pub item_recs: String,
    pub user_specific_recs: String,
    pub user_general_recs: String,
}

impl Default for DatasetNames {
    fn default() -> Self {
        Self {
            user_ids: "user_ids".to_string(),
            item_ids: "item_ids".to_string(),
            user_gravatar_ids: "user_gravatar_ids".to_string(),
            user_item_affinities: "user_item_affinities".to_string(),
            item_metadata: "item_metadata".to_string(),
            item_neighborhoods: "item_neighborhoods".to_string(),
            item_recs: "item_recs".to_string(),
            user_specific_recs: "user_specific_recs".to_string(),
            user_general_recs: "user_general_recs".to_string(),
        }
    }
}

impl DatasetNames {
    pub fn name(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::UserIds => &self.user_ids,
            Dataset::ItemIds => &self.item_ids,
            Dataset::UserGravatarIds => &self.user_gravatar_ids,
            Dataset::UserItemAffinities => &self.user_item_affinities,
            Dataset::ItemMetadata => &self.item_metadata,
            Dataset::ItemNeighborhoods => &self.item_neighborhoods,
            Dataset::ItemRecs => &self.item_recs,
            Dataset::UserSpecificRecs => &self.user_specific_recs,
            Dataset::UserGeneralRecs => &self.user_general_recs,
        }
    }
}

/// Validated, immutable pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub root: PathBuf,
    /// Event-log pattern relative to `root`, `*` wildcards per segment
    pub events: String,
    /// Worker threads of the stage thread pool
    pub parallelism: usize,
    pub datasets: DatasetNames,
    pub invalid_event_policy: InvalidEventPolicy,
    pub neighborhoods: NeighborhoodConfig,
    pub recommend: RecommendConfig,
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Full path of a dataset under the root
    pub fn dataset_path(&self, dataset: Dataset) -> PathBuf {
        self.root.join(self.datasets.name(dataset))
    }
}

/// Where the datasets live, for commands that only read earlier outputs
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetLocations {
    pub root: PathBuf,
    pub datasets: DatasetNames,
}

impl DatasetLocations {
    pub fn dataset_path(&self, dataset: Dataset) -> PathBuf {
        self.root.join(self.datasets.name(dataset))
    }
}

/// Partial settings, as read from a config file or collected from flags.
///
/// Every field is optional until [`build`](Self::build) checks them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfigBuilder {
    pub root: Option<PathBuf>,
    pub events: Option<String>,
    pub parallelism: Option<usize>,
    pub datasets: DatasetNames,
    pub invalid_event_policy: InvalidEventPolicy,
    pub neighborhoods: NeighborhoodConfig,
    pub recommend: RecommendConfig,
}

impl PipelineConfigBuilder {
    /// Read a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn events(mut self, pattern: impl Into<String>) -> Self {
        self.events = Some(pattern.into());
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn invalid_event_policy(mut self, policy: InvalidEventPolicy) -> Self {
        self.invalid_event_policy = policy;
        self
    }

    pub fn neighborhoods(mut self, config: NeighborhoodConfig) -> Self {
        self.neighborhoods = config;
        self
    }

    pub fn recommend(mut self, config: RecommendConfig) -> Self {
        self.recommend = config;
        self
    }

    /// Validate only the root and the dataset names.
    ///
    /// Commands that inspect earlier outputs need no event pattern or
    /// tuning parameters.
    pub fn build_locations(self) -> Result<DatasetLocations, ConfigError> {
        let root = require_root(self.root)?;
        check_dataset_names(&self.datasets)?;
        Ok(DatasetLocations {
            root,
            datasets: self.datasets,
        })
    }

    /// Validate and freeze the settings.
    ///
    /// Parallelism defaults to the number of available CPUs.
    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let root = require_root(self.root)?;
        let events = self
            .events
            .filter(|events| !events.trim().is_empty())
            .ok_or(ConfigError::MissingConfiguration("events"))?;

        let parallelism = match self.parallelism {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    field: "parallelism",
                    reason: "must be at least 1".to_string(),
                });
            }
            Some(n) => n,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        };

        check_dataset_names(&self.datasets)?;

        if self.neighborhoods.neighborhood_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "neighborhoods.neighborhood_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.neighborhoods.prior.is_finite() && self.neighborhoods.prior >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "neighborhoods.prior",
                reason: format!("{} is not a finite, non-negative number", self.neighborhoods.prior),
            });
        }
        if self.recommend.max_recs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "recommend.max_recs",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.recommend.popularity_weight.is_finite() && self.recommend.popularity_weight >= 0.0)
        {
            return Err(ConfigError::InvalidValue {
                field: "recommend.popularity_weight",
                reason: format!(
                    "{} is not a finite, non-negative number",
                    self.recommend.popularity_weight
                ),
            });
        }

        Ok(PipelineConfig {
            root,
            events,
            parallelism,
            datasets: self.datasets,
            invalid_event_policy: self.invalid_event_policy,
            neighborhoods: self.neighborhoods,
            recommend: self.recommend,
        })
    }
}

fn require_root(root: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    root.filter(|root| !root.as_os_str().is_empty())
        .ok_or(ConfigError::MissingConfiguration("root"))
}

fn check_dataset_names(names: &DatasetNames) -> Result<(), ConfigError> {
    for dataset in [
        Dataset::UserIds,
        Dataset::ItemIds,
        Dataset::UserGravatarIds,
        Dataset::UserItemAffinities,
        Dataset::ItemMetadata,
        Dataset::ItemNeighborhoods,
        Dataset::ItemRecs,
        Dataset::UserSpecificRecs,
        Dataset::UserGeneralRecs,
    ] {
        if names.name(dataset).is_empty() {
            return Err(ConfigError::MissingConfiguration(dataset.key()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_build_with_defaults() {
        let config = PipelineConfig::builder()
            .root("/data/github")
            .events("raw_events/*/*")
            .parallelism(4)
            .build()
            .unwrap();

        assert_eq!(config.parallelism, 4);
        assert_eq!(
            config.dataset_path(Dataset::UserItemAffinities),
            PathBuf::from("/data/github/user_item_affinities")
        );
        assert_eq!(config.invalid_event_policy, InvalidEventPolicy::Abort);
        assert_eq!(config.recommend.max_recs, 10);
    }

    #[test]
    fn test_missing_root_or_events() {
        let err = PipelineConfig::builder().events("x").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfiguration("root")));

        let err = PipelineConfig::builder().root("").events("x").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfiguration("root")));

        let err = PipelineConfig::builder().root("/data").events("  ").build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfiguration("events")));
    }

    #[test]
    fn test_zero_parallelism_is_invalid() {
        let err = PipelineConfig::builder()
            .root("/data")
            .events("*")
            .parallelism(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "parallelism", .. }));
    }

    #[test]
    fn test_empty_dataset_name_is_missing() {
        let mut builder = PipelineConfig::builder().root("/data").events("*");
        builder.datasets.item_recs = String::new();
        let err = builder.build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfiguration("item_recs")));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "root": "/data/github",
                "events": "raw_events/*/*/*/*",
                "parallelism": 30,
                "invalid_event_policy": "skip_and_log",
                "datasets": {{ "item_recs": "item_recs_log" }},
                "neighborhoods": {{ "neighborhood_size": 5, "similarity": "cosine" }},
                "recommend": {{ "max_recs": 3 }}
            }}"#
        )
        .unwrap();

        let config = PipelineConfigBuilder::from_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.parallelism, 30);
        assert_eq!(config.invalid_event_policy, InvalidEventPolicy::SkipAndLog);
        assert_eq!(config.datasets.item_recs, "item_recs_log");
        assert_eq!(config.datasets.user_ids, "user_ids");
        assert_eq!(config.neighborhoods.neighborhood_size, 5);
        assert_eq!(config.recommend.max_recs, 3);
        assert_eq!(config.recommend.cold_start_min_items, 2);
    }

    #[test]
    fn test_flags_override_file() {
        let builder: PipelineConfigBuilder =
            serde_json::from_str(r#"{"root": "/from/file", "events": "a/*"}"#).unwrap();
        let config = builder.root("/from/flag").build().unwrap();
        assert_eq!(config.root, PathBuf::from("/from/flag"));
        assert_eq!(config.events, "a/*");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "roots": "/typo" }}"#).unwrap();
        let err = PipelineConfigBuilder::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_locations_need_only_the_root() {
        let locations = PipelineConfig::builder()
            .root("/data/github")
            .build_locations()
            .unwrap();
        assert_eq!(
            locations.dataset_path(Dataset::ItemRecs),
            PathBuf::from("/data/github/item_recs")
        );

        let err = PipelineConfig::builder().build_locations().unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfiguration("root")));
    }
}
