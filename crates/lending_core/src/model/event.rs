//! Lifecycle event model.
//!
//! # Invariants
//! - Events are immutable once written.
//! - `record_id` is a weak reference; the record may since have been deleted.
//! - `sequence` is the storage key and defines chronological order.

use crate::model::record::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of catalog state transition captured by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleEventKind {
    Added,
    Removed,
    CheckedIn,
    CheckedOut,
}

impl LifecycleEventKind {
    /// Stable wire name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Removed => "REMOVED",
            Self::CheckedIn => "CHECKED_IN",
            Self::CheckedOut => "CHECKED_OUT",
        }
    }

    /// Human-readable summary for history views.
    pub fn title(self) -> &'static str {
        match self {
            Self::Added => "Record added to catalog",
            Self::Removed => "Record removed from catalog",
            Self::CheckedIn => "Record checked in",
            Self::CheckedOut => "Record checked out",
        }
    }

    /// Whether this kind changes lending status.
    pub fn is_status_transition(self) -> bool {
        matches!(self, Self::CheckedIn | Self::CheckedOut)
    }
}

impl Display for LifecycleEventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable fact about a record's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Position in the log; starts at 1.
    pub sequence: u64,
    pub kind: LifecycleEventKind,
    pub record_id: RecordId,
    /// Unix epoch milliseconds at capture time.
    pub recorded_at_ms: i64,
}

impl LifecycleEvent {
    /// Capture time in UTC; `None` when the stored value is out of range.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.recorded_at_ms)
    }

    /// Capture time in Unix `date` layout, e.g. `Tue Nov 14 22:13:20 UTC 2023`.
    pub fn pretty_time(&self) -> String {
        match self.recorded_at() {
            Some(at) => at.format("%a %b %e %H:%M:%S UTC %Y").to_string(),
            None => format!("@{}ms", self.recorded_at_ms),
        }
    }
}
