//! Event valuation: how much each kind of interaction is worth.
//!
//! Every event type maps to a fixed [`WeightVector`]:
//!
//! | event            | specific | general | graph |
//! |------------------|----------|---------|-------|
//! | PushEvent        | 1.00     | 0.00    | 1.00  |
//! | ForkEvent        | 0.00     | 1.00    | 0.50  |
//! | PullRequestEvent | 1.00     | 0.00    | 1.00  |
//! | WatchEvent       | 0.00     | 0.50    | 0.25  |
//!
//! The set of event types is closed. Adding one means adding an
//! [`EventType`] variant, and the exhaustive match in
//! [`EventType::weights`] will not compile until it has a row.

use crate::error::{Result, ScoringError};
use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Raw, unscaled weight of one or more events between a user and an item
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WeightVector {
    pub specific_interest: f64,
    pub general_interest: f64,
    pub graph_score: f64,
}

impl WeightVector {
    pub const ZERO: WeightVector = WeightVector::new(0.0, 0.0, 0.0);

    pub const fn new(specific_interest: f64, general_interest: f64, graph_score: f64) -> Self {
        Self {
            specific_interest,
            general_interest,
            graph_score,
        }
    }

    /// Apply `f` to each dimension independently
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(
            f(self.specific_interest),
            f(self.general_interest),
            f(self.graph_score),
        )
    }
}

impl Add for WeightVector {
    type Output = WeightVector;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.specific_interest + rhs.specific_interest,
            self.general_interest + rhs.general_interest,
            self.graph_score + rhs.graph_score,
        )
    }
}

impl AddAssign for WeightVector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The event types that carry interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Push,
    Fork,
    PullRequest,
    Watch,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Push,
        EventType::Fork,
        EventType::PullRequest,
        EventType::Watch,
    ];

    /// Name as it appears in the event logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Push => "PushEvent",
            EventType::Fork => "ForkEvent",
            EventType::PullRequest => "PullRequestEvent",
            EventType::Watch => "WatchEvent",
        }
    }

    pub fn weights(self) -> WeightVector {
        match self {
            EventType::Push => WeightVector::new(1.00, 0.00, 1.00),
            EventType::Fork => WeightVector::new(0.00, 1.00, 0.50),
            EventType::PullRequest => WeightVector::new(1.00, 0.00, 1.00),
            EventType::Watch => WeightVector::new(0.00, 0.50, 0.25),
        }
    }
}

impl FromStr for EventType {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PushEvent" => Ok(EventType::Push),
            "ForkEvent" => Ok(EventType::Fork),
            "PullRequestEvent" => Ok(EventType::PullRequest),
            "WatchEvent" => Ok(EventType::Watch),
            other => Err(ScoringError::InvalidEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value a raw event type string.
///
/// Pure and reentrant; any string outside the closed set is an
/// `InvalidEventType` error.
pub fn value_event(event_type: &str) -> Result<WeightVector> {
    event_type.parse::<EventType>().map(EventType::weights)
}
