//! Stage and dataset catalog.
//!
//! Each stage declares the datasets it reads and writes. The orchestrator
//! checks the inputs before a stage starts, so a stage can also be run on
//! its own once an earlier run has produced them.

use std::fmt;
use std::str::FromStr;

/// The three pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    ExtractEvents,
    GenItemRecs,
    GenUserRecs,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::ExtractEvents, Stage::GenItemRecs, Stage::GenUserRecs];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ExtractEvents => "extract_events",
            Stage::GenItemRecs => "gen_item_recs",
            Stage::GenUserRecs => "gen_user_recs",
        }
    }

    /// Human readable description, logged when the stage starts
    pub fn description(self) -> &'static str {
        match self {
            Stage::ExtractEvents => {
                "extracting user-item interactions and item metadata from raw event logs"
            }
            Stage::GenItemRecs => "generating recommendations for each item",
            Stage::GenUserRecs => "generating recommendations for each user",
        }
    }

    /// Datasets that must exist before the stage runs.
    ///
    /// `extract_events` reads the raw event logs, which are checked through
    /// the configured pattern instead.
    pub fn inputs(self) -> &'static [Dataset] {
        match self {
            Stage::ExtractEvents => &[],
            Stage::GenItemRecs => &[
                Dataset::ItemIds,
                Dataset::UserItemAffinities,
                Dataset::ItemMetadata,
            ],
            Stage::GenUserRecs => &[
                Dataset::UserIds,
                Dataset::ItemIds,
                Dataset::UserItemAffinities,
                Dataset::ItemNeighborhoods,
                Dataset::ItemMetadata,
            ],
        }
    }

    pub fn outputs(self) -> &'static [Dataset] {
        match self {
            Stage::ExtractEvents => &[
                Dataset::UserIds,
                Dataset::ItemIds,
                Dataset::UserGravatarIds,
                Dataset::UserItemAffinities,
                Dataset::ItemMetadata,
            ],
            Stage::GenItemRecs => &[Dataset::ItemNeighborhoods, Dataset::ItemRecs],
            Stage::GenUserRecs => &[Dataset::UserSpecificRecs, Dataset::UserGeneralRecs],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown stage '{}', expected one of: extract_events, gen_item_recs, gen_user_recs",
                    s
                )
            })
    }
}

/// Every dataset exchanged between stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    UserIds,
    ItemIds,
    UserGravatarIds,
    UserItemAffinities,
    ItemMetadata,
    ItemNeighborhoods,
    ItemRecs,
    UserSpecificRecs,
    UserGeneralRecs,
}

impl Dataset {
    /// Key used in logs and in the `datasets` config section
    pub fn key(self) -> &'static str {
        match self {
            Dataset::UserIds => "user_ids",
            Dataset::ItemIds => "item_ids",
            Dataset::UserGravatarIds => "user_gravatar_ids",
            Dataset::UserItemAffinities => "user_item_affinities",
            Dataset::ItemMetadata => "item_metadata",
            Dataset::ItemNeighborhoods => "item_neighborhoods",
            Dataset::ItemRecs => "item_recs",
            Dataset::UserSpecificRecs => "user_specific_recs",
            Dataset::UserGeneralRecs => "user_general_recs",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
