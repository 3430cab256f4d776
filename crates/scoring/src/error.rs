//! Error types for the scoring crate.

use thiserror::Error;

/// Errors raised by the per-record scoring functions.
///
/// These are never caught or logged inside the scoring code; the caller
/// decides whether a bad record aborts the batch or is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    /// The event type is outside the closed set of valued events
    #[error("Received invalid event type: {0}")]
    InvalidEventType(String),
}

pub type Result<T> = std::result::Result<T, ScoringError>;
