//! Parsers for raw event logs and the pipeline's own datasets.
//!
//! Two input shapes are handled:
//! - Event logs: newline-delimited JSON in the classic GitHub Archive shape
//! - Datasets: tab-separated rows written by [`crate::writer`]
//!
//! Rust concepts you'll learn here:
//! - Deserializing nested JSON with serde derive
//! - Error handling with `?` and `ok_or_else`
//! - Converting between types (parsing strings to numbers and timestamps)

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::fs;
use std::path::Path;

// =============================================================================
// Event Logs
// =============================================================================

/// One JSON line of the raw event log, as it appears on disk
#[derive(Debug, Deserialize)]
struct RawLogLine {
    #[serde(rename = "type")]
    event_type: String,
    actor: Option<String>,
    created_at: DateTime<FixedOffset>,
    repository: Option<RawRepository>,
    #[serde(default)]
    actor_attributes: Option<RawActorAttributes>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: String,
    name: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    watchers: u32,
    #[serde(default)]
    forks: u32,
}

#[derive(Debug, Default, Deserialize)]
struct RawActorAttributes {
    #[serde(default)]
    gravatar_id: Option<String>,
}

/// Read a whole file, mapping a missing file to `FileNotFound`
fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse one event-log line into an [`EventRecord`]
///
/// The event type is NOT checked here; see the scoring crate.
pub fn parse_event_line(line: &str, file: &str, line_no: usize) -> Result<EventRecord> {
    let raw: RawLogLine = serde_json::from_str(line).map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason: format!("Invalid JSON: {}", e),
    })?;

    let actor = raw
        .actor
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: "Missing actor".to_string(),
        })?;

    let repository = raw.repository.ok_or_else(|| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason: "Missing repository".to_string(),
    })?;

    let item_id = format!("{}/{}", repository.owner, repository.name);
    let gravatar_id = raw
        .actor_attributes
        .and_then(|attrs| attrs.gravatar_id)
        .filter(|g| !g.is_empty());

    Ok(EventRecord {
        event: Event {
            user_id: actor,
            item_id: item_id.clone(),
            event_type: raw.event_type,
            timestamp: raw.created_at,
        },
        metadata: ItemMetadata {
            item_id,
            owner: repository.owner,
            name: repository.name,
            language: repository.language.filter(|l| !l.is_empty()),
            description: repository.description.filter(|d| !d.is_empty()),
            watchers: repository.watchers,
            forks: repository.forks,
            timestamp: raw.created_at,
        },
        gravatar_id,
    })
}

/// Parse a newline-delimited JSON event log
pub fn parse_event_log(path: &Path) -> Result<Vec<EventRecord>> {
    let content = read_to_string(path)?;
    let file = file_label(path);
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue; // Skip empty lines
        }
        records.push(parse_event_line(line_trimmed, &file, idx + 1)?);
    }

    Ok(records)
}

// =============================================================================
// Tab-Separated Datasets
// =============================================================================

/// Split every non-empty line of a dataset into exactly `expected` fields
fn read_rows(path: &Path, expected: usize) -> Result<Vec<(usize, Vec<String>)>> {
    let content = read_to_string(path)?;
    let file = file_label(path);
    let mut rows = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split('\t').map(|f| f.to_string()).collect();
        if fields.len() != expected {
            return Err(DataLoadError::FieldCountMismatch {
                file,
                expected,
                found: fields.len(),
                line: idx + 1,
            });
        }
        rows.push((idx + 1, fields));
    }

    Ok(rows)
}

fn parse_number<T>(value: &str, field: &str, file: &str, line: usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: format!("Invalid {}: {}", field, e),
    })
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse an identifier list (`user_ids`, `item_ids`)
pub fn parse_ids(path: &Path) -> Result<Vec<String>> {
    Ok(read_rows(path, 1)?
        .into_iter()
        .map(|(_, mut fields)| fields.remove(0))
        .collect())
}

/// Parse `user_item_affinities`
///
/// Format: user_id \t item_id \t specific \t general \t graph
pub fn parse_affinities(path: &Path) -> Result<Vec<Affinity>> {
    let file = file_label(path);
    read_rows(path, 5)?
        .into_iter()
        .map(|(line, fields)| {
            Ok(Affinity {
                specific_interest: parse_number(&fields[2], "specific_interest", &file, line)?,
                general_interest: parse_number(&fields[3], "general_interest", &file, line)?,
                graph_score: parse_number(&fields[4], "graph_score", &file, line)?,
                user_id: fields[0].clone(),
                item_id: fields[1].clone(),
            })
        })
        .collect()
}

/// Parse `item_metadata`
///
/// Format: item_id \t owner \t name \t language \t watchers \t forks \t timestamp \t description
pub fn parse_metadata(path: &Path) -> Result<Vec<ItemMetadata>> {
    let file = file_label(path);
    read_rows(path, 8)?
        .into_iter()
        .map(|(line, fields)| {
            let timestamp = DateTime::parse_from_rfc3339(&fields[6]).map_err(|e| {
                DataLoadError::ParseError {
                    file: file.clone(),
                    line,
                    reason: format!("Invalid timestamp: {}", e),
                }
            })?;
            Ok(ItemMetadata {
                item_id: fields[0].clone(),
                owner: fields[1].clone(),
                name: fields[2].clone(),
                language: optional(&fields[3]),
                watchers: parse_number(&fields[4], "watchers", &file, line)?,
                forks: parse_number(&fields[5], "forks", &file, line)?,
                timestamp,
                description: optional(&fields[7]),
            })
        })
        .collect()
}

/// Parse `user_gravatar_ids`
pub fn parse_gravatar_ids(path: &Path) -> Result<Vec<(UserId, String)>> {
    Ok(read_rows(path, 2)?
        .into_iter()
        .map(|(_, fields)| (fields[0].clone(), fields[1].clone()))
        .collect())
}

/// Parse ranked `(subject, item, score, rank)` rows back into grouped lists.
///
/// Rows are regrouped by subject in file order; the rank column only
/// documents the order the writer produced, except that rank 0 marks a
/// subject with an empty list.
fn parse_ranked_rows(path: &Path) -> Result<Vec<(String, Vec<ScoredItem>)>> {
    let file = file_label(path);
    let mut grouped: Vec<(String, Vec<ScoredItem>)> = Vec::new();

    for (line, fields) in read_rows(path, 4)? {
        let score: f64 = parse_number(&fields[2], "score", &file, line)?;
        let rank: usize = parse_number(&fields[3], "rank", &file, line)?;

        // Rank 0 marks a subject whose list is empty
        if rank == 0 {
            grouped.push((fields[0].clone(), Vec::new()));
            continue;
        }
        let item = ScoredItem::new(fields[1].clone(), score);

        match grouped.last_mut() {
            Some((subject, items)) if *subject == fields[0] => items.push(item),
            _ => grouped.push((fields[0].clone(), vec![item])),
        }
    }

    Ok(grouped)
}

/// Parse `item_neighborhoods`
pub fn parse_neighborhoods(path: &Path) -> Result<Vec<ItemNeighborhood>> {
    Ok(parse_ranked_rows(path)?
        .into_iter()
        .map(|(anchor_item_id, neighbors)| ItemNeighborhood {
            anchor_item_id,
            neighbors,
        })
        .collect())
}

/// Parse `item_recs`, `user_specific_recs` or `user_general_recs`
pub fn parse_recommendations(path: &Path) -> Result<Vec<Recommendation>> {
    Ok(parse_ranked_rows(path)?
        .into_iter()
        .map(|(subject_id, items)| Recommendation { subject_id, items })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUSH_LINE: &str = r#"{"type":"PushEvent","actor":"alice","created_at":"2012-03-11T06:36:33-07:00","repository":{"owner":"rails","name":"rails","language":"Ruby","description":"Web framework","watchers":120,"forks":30},"actor_attributes":{"gravatar_id":"abc123"}}"#;

    #[test]
    fn test_parse_event_line() {
        let record = parse_event_line(PUSH_LINE, "log.json", 1).unwrap();

        assert_eq!(record.event.user_id, "alice");
        assert_eq!(record.event.item_id, "rails/rails");
        assert_eq!(record.event.event_type, "PushEvent");
        assert_eq!(record.metadata.language.as_deref(), Some("Ruby"));
        assert_eq!(record.metadata.watchers, 120);
        assert_eq!(record.gravatar_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_unknown_event_type_is_kept_verbatim() {
        let line = PUSH_LINE.replace("PushEvent", "GollumEvent");
        let record = parse_event_line(&line, "log.json", 1).unwrap();
        assert_eq!(record.event.event_type, "GollumEvent");
    }

    #[test]
    fn test_missing_repository_is_an_error() {
        let line = r#"{"type":"PushEvent","actor":"alice","created_at":"2012-03-11T06:36:33-07:00"}"#;
        let err = parse_event_line(line, "log.json", 7).unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { line: 7, .. }));
    }

    #[test]
    fn test_missing_actor_is_an_error() {
        let line = PUSH_LINE.replace(r#""actor":"alice","#, "");
        assert!(parse_event_line(&line, "log.json", 1).is_err());
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional(""), None);
        assert_eq!(optional("Go"), Some("Go".to_string()));
    }
}
