//! Event-log discovery and parallel loading.
//!
//! Event logs are addressed by a glob pattern relative to the root path,
//! e.g. `raw_events/*/*/*/*` or `raw_events/**/*.json`. Hidden entries,
//! including the `.partial` files of an interrupted write, never match.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::EventRecord;
use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}

/// Expand `pattern` under `root` into a sorted list of existing files
pub fn expand_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    // The root is taken literally; only the pattern may carry wildcards
    let root = root.to_string_lossy();
    let full = format!(
        "{}/{}",
        Pattern::escape(root.trim_end_matches('/')),
        pattern.trim_start_matches('/')
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let paths = glob::glob_with(&full, options).map_err(|e| DataLoadError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| DataLoadError::IoError(e.into_error()))?;
        if path.is_file() && !is_hidden(&path) {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(DataLoadError::NoInputFiles { pattern: full });
    }
    Ok(files)
}

/// Discover and parse every event log matched by `pattern`, in parallel.
///
/// Records come back in file order, then line order, no matter how the
/// files were scheduled across threads.
pub fn load_event_logs(root: &Path, pattern: &str) -> Result<Vec<EventRecord>> {
    let files = expand_pattern(root, pattern)?;
    info!("Loading {} event log file(s) from {}", files.len(), root.display());

    let per_file: Vec<Vec<EventRecord>> = files
        .par_iter()
        .map(|path| {
            let records = parser::parse_event_log(path)?;
            debug!("Parsed {} records from {}", records.len(), path.display());
            Ok(records)
        })
        .collect::<Result<_>>()?;

    let records: Vec<EventRecord> = per_file.into_iter().flatten().collect();
    info!("Loaded {} event records", records.len());
    Ok(records)
}
