//! AffinityIndex building and validation.
//!
//! Later stages read the extracted datasets back from disk and need fast
//! per-user and per-item lookups. This module builds the index and checks
//! the invariants the extract stage promises:
//! - every affinity dimension is finite and inside (-1, 1)
//! - each (user, item) pair appears at most once

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

impl AffinityIndex {
    /// Build an index from already materialized rows
    pub fn from_parts(affinities: Vec<Affinity>, metadata: Vec<ItemMetadata>) -> Self {
        let mut index = AffinityIndex::new();
        for affinity in affinities {
            index.insert_affinity(affinity);
        }
        for item in metadata {
            index.insert_metadata(item);
        }
        index
    }

    /// Load `user_item_affinities` and `item_metadata` from disk.
    ///
    /// Both files are parsed in parallel with `rayon::join`.
    pub fn load_from_files(affinities_path: &Path, metadata_path: &Path) -> Result<Self> {
        info!(
            "Loading affinities from {} and metadata from {}",
            affinities_path.display(),
            metadata_path.display()
        );

        let (affinities, metadata) = rayon::join(
            || parser::parse_affinities(affinities_path),
            || parser::parse_metadata(metadata_path),
        );
        let affinities = affinities?;
        let metadata = metadata?;

        info!(
            "Loaded {} affinities and {} metadata records",
            affinities.len(),
            metadata.len()
        );

        let index = Self::from_parts(affinities, metadata);
        index.validate()?;
        Ok(index)
    }

    /// Validate data integrity
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();

        for affinity in self.affinities() {
            if !seen.insert((affinity.user_id.as_str(), affinity.item_id.as_str())) {
                return Err(DataLoadError::ValidationError(format!(
                    "duplicate affinity for ({}, {})",
                    affinity.user_id, affinity.item_id
                )));
            }
            for (field, value) in [
                ("specific_interest", affinity.specific_interest),
                ("general_interest", affinity.general_interest),
                ("graph_score", affinity.graph_score),
            ] {
                if !value.is_finite() || value <= -1.0 || value >= 1.0 {
                    return Err(DataLoadError::InvalidValue {
                        field: field.to_string(),
                        value: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn affinity(user: &str, item: &str, graph: f64) -> Affinity {
        Affinity {
            user_id: user.to_string(),
            item_id: item.to_string(),
            specific_interest: 0.0,
            general_interest: 0.0,
            graph_score: graph,
        }
    }

    #[test]
    fn test_validate_accepts_scaled_values() {
        let index = AffinityIndex::from_parts(
            vec![affinity("u1", "i1", 0.5), affinity("u1", "i2", -0.99)],
            vec![],
        );
        assert!(index.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unscaled_values() {
        let index = AffinityIndex::from_parts(vec![affinity("u1", "i1", 1.25)], vec![]);
        assert!(matches!(
            index.validate(),
            Err(DataLoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_pairs() {
        let index = AffinityIndex::from_parts(
            vec![affinity("u1", "i1", 0.1), affinity("u1", "i1", 0.2)],
            vec![],
        );
        assert!(matches!(
            index.validate(),
            Err(DataLoadError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = AffinityIndex::load_from_files(
            &dir.path().join("user_item_affinities"),
            &dir.path().join("item_metadata"),
        );
        assert!(matches!(result, Err(DataLoadError::FileNotFound { .. })));
    }
}
