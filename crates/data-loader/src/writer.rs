//! Writers for the tab-separated datasets.
//!
//! A stage stages each of its outputs in a hidden `.partial` sibling through
//! a [`DatasetBatch`]. Nothing is renamed into place until every output has
//! been written and every target checked, so a failing stage commits none of
//! its datasets. Dropping an uncommitted batch removes its partial files.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.partial", name))
}

/// Outputs of one stage, committed together or not at all
#[derive(Debug, Default)]
pub struct DatasetBatch {
    /// (partial, target) in the order they were staged
    staged: Vec<(PathBuf, PathBuf)>,
}

impl DatasetBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged outputs
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Write rows to the partial file of `path`
    fn stage<F>(&mut self, path: &Path, write_rows: F) -> Result<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let partial = partial_path(path);
        let result = File::create(&partial).and_then(|file| {
            let mut writer = BufWriter::new(file);
            write_rows(&mut writer)?;
            writer.flush()
        });

        match result {
            Ok(()) => {
                self.staged.push((partial, path.to_path_buf()));
                Ok(())
            }
            Err(e) => {
                // Best effort: the partial file is garbage either way
                let _ = fs::remove_file(&partial);
                Err(e.into())
            }
        }
    }

    /// Rename every staged output into place.
    ///
    /// All targets are checked before the first rename; a target that is a
    /// directory fails the whole batch and leaves every dataset untouched.
    pub fn commit(mut self) -> Result<()> {
        for (_, target) in &self.staged {
            if target.is_dir() {
                return Err(DataLoadError::ValidationError(format!(
                    "cannot replace directory {} with a dataset",
                    target.display()
                )));
            }
        }

        let staged = std::mem::take(&mut self.staged);
        let mut pending = staged.iter();
        while let Some((partial, target)) = pending.next() {
            if let Err(e) = fs::rename(partial, target) {
                for (rest, _) in pending {
                    let _ = fs::remove_file(rest);
                }
                let _ = fs::remove_file(partial);
                return Err(e.into());
            }
            debug!("Committed {}", target.display());
        }
        Ok(())
    }

    pub fn write_ids(&mut self, path: &Path, ids: &[String]) -> Result<()> {
        self.stage(path, |w| {
            for id in ids {
                writeln!(w, "{}", id)?;
            }
            Ok(())
        })
    }

    pub fn write_affinities(&mut self, path: &Path, affinities: &[Affinity]) -> Result<()> {
        self.stage(path, |w| {
            for a in affinities {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    a.user_id, a.item_id, a.specific_interest, a.general_interest, a.graph_score
                )?;
            }
            Ok(())
        })
    }

    pub fn write_metadata(&mut self, path: &Path, metadata: &[ItemMetadata]) -> Result<()> {
        self.stage(path, |w| {
            for m in metadata {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    m.item_id,
                    sanitize(&m.owner),
                    sanitize(&m.name),
                    m.language.as_deref().map(sanitize).unwrap_or_default(),
                    m.watchers,
                    m.forks,
                    m.timestamp.to_rfc3339(),
                    m.description.as_deref().map(sanitize).unwrap_or_default(),
                )?;
            }
            Ok(())
        })
    }

    pub fn write_gravatar_ids(
        &mut self,
        path: &Path,
        gravatar_ids: &[(UserId, String)],
    ) -> Result<()> {
        self.stage(path, |w| {
            for (user_id, gravatar_id) in gravatar_ids {
                writeln!(w, "{}\t{}", user_id, sanitize(gravatar_id))?;
            }
            Ok(())
        })
    }

    pub fn write_neighborhoods(
        &mut self,
        path: &Path,
        neighborhoods: &[ItemNeighborhood],
    ) -> Result<()> {
        self.stage(path, |w| {
            write_ranked_rows(
                w,
                neighborhoods
                    .iter()
                    .map(|n| (n.anchor_item_id.as_str(), n.neighbors.as_slice())),
            )
        })
    }

    pub fn write_recommendations(
        &mut self,
        path: &Path,
        recommendations: &[Recommendation],
    ) -> Result<()> {
        self.stage(path, |w| {
            write_ranked_rows(
                w,
                recommendations
                    .iter()
                    .map(|r| (r.subject_id.as_str(), r.items.as_slice())),
            )
        })
    }
}

impl Drop for DatasetBatch {
    fn drop(&mut self) {
        for (partial, _) in &self.staged {
            let _ = fs::remove_file(partial);
        }
    }
}

/// Free text must not break the row format
fn sanitize(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

/// One row per ranked item; an empty list is a single `subject, "", 0, 0` row
fn write_ranked_rows<'a, I>(w: &mut BufWriter<File>, groups: I) -> std::io::Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a [ScoredItem])>,
{
    for (subject, items) in groups {
        if items.is_empty() {
            writeln!(w, "{}\t\t0\t0", subject)?;
            continue;
        }
        for (rank, item) in items.iter().enumerate() {
            writeln!(w, "{}\t{}\t{}\t{}", subject, item.item_id, item.score, rank + 1)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use chrono::DateTime;

    #[test]
    fn test_affinities_survive_a_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_item_affinities");
        let rows = vec![Affinity {
            user_id: "u1".to_string(),
            item_id: "o/i1".to_string(),
            specific_interest: 0.083,
            general_interest: -0.25,
            graph_score: 0.1,
        }];

        let mut batch = DatasetBatch::new();
        batch.write_affinities(&path, &rows).unwrap();
        assert!(!path.exists());
        batch.commit().unwrap();

        assert_eq!(parser::parse_affinities(&path).unwrap(), rows);
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_metadata_free_text_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_metadata");
        let metadata = ItemMetadata {
            item_id: "o/n".to_string(),
            owner: "o".to_string(),
            name: "n".to_string(),
            language: None,
            description: Some("line one\nline\ttwo".to_string()),
            watchers: 3,
            forks: 1,
            timestamp: DateTime::parse_from_rfc3339("2012-03-11T06:36:33-07:00").unwrap(),
        };

        let mut batch = DatasetBatch::new();
        batch.write_metadata(&path, &[metadata]).unwrap();
        batch.commit().unwrap();
        let parsed = parser::parse_metadata(&path).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].description.as_deref(), Some("line one line two"));
        assert_eq!(parsed[0].language, None);
    }

    #[test]
    fn test_ranked_rows_regroup_by_subject() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("item_recs");
        let recs = vec![
            Recommendation {
                subject_id: "a".to_string(),
                items: vec![ScoredItem::new("b", 0.9), ScoredItem::new("c", 0.5)],
            },
            Recommendation::empty("lonely"),
            Recommendation {
                subject_id: "b".to_string(),
                items: vec![ScoredItem::new("a", 0.9)],
            },
        ];

        let mut batch = DatasetBatch::new();
        batch.write_recommendations(&path, &recs).unwrap();
        batch.commit().unwrap();
        let parsed = parser::parse_recommendations(&path).unwrap();

        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].subject_id, "a");
        assert_eq!(parsed[0].items.len(), 2);
        assert_eq!(parsed[1].subject_id, "lonely");
        assert!(parsed[1].is_empty());
        assert_eq!(parsed[2].items[0].item_id, "a");
    }

    #[test]
    fn test_empty_list_keeps_a_marker_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user_specific_recs");

        let mut batch = DatasetBatch::new();
        batch
            .write_recommendations(&path, &[Recommendation::empty("dave")])
            .unwrap();
        batch.commit().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "dave\t\t0\t0\n");
    }

    #[test]
    fn test_dropped_batch_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ids = dir.path().join("user_ids");

        let mut batch = DatasetBatch::new();
        batch.write_ids(&ids, &["alice".to_string()]).unwrap();
        assert!(partial_path(&ids).exists());
        drop(batch);

        assert!(!ids.exists());
        assert!(!partial_path(&ids).exists());
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ids = dir.path().join("user_ids");
        let metadata = dir.path().join("item_metadata");
        fs::write(&ids, "old\n").unwrap();
        fs::create_dir_all(metadata.join("occupied")).unwrap();

        let mut batch = DatasetBatch::new();
        batch.write_ids(&ids, &["alice".to_string()]).unwrap();
        batch.write_metadata(&metadata, &[]).unwrap();
        assert_eq!(batch.len(), 2);

        let err = batch.commit().unwrap_err();
        assert!(matches!(err, DataLoadError::ValidationError(_)));
        assert_eq!(fs::read_to_string(&ids).unwrap(), "old\n");
        assert!(!partial_path(&ids).exists());
        assert!(!partial_path(&metadata).exists());
    }
}
