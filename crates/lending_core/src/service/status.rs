//! Lending status policy.
//!
//! The stored `checked_out` flag on a catalog record is the only source of
//! lending status. Reads never replay the event log. The log is an audit trail,
//! and `find_status_drift` compares the two to surface records whose flag and
//! latest status event disagree (for example after a failed best-effort
//! append).

use crate::model::event::{LifecycleEvent, LifecycleEventKind};
use crate::model::record::{CatalogRecord, RecordId};

/// Whether a record is on the shelf or lent out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingStatus {
    Available,
    CheckedOut,
}

impl LendingStatus {
    /// Status as read from the record flag.
    pub fn of(record: &CatalogRecord) -> Self {
        Self::from_flag(record.checked_out)
    }

    fn from_flag(checked_out: bool) -> Self {
        if checked_out {
            Self::CheckedOut
        } else {
            Self::Available
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::CheckedOut => "checked_out",
        }
    }
}

/// A record whose flag disagrees with its audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDrift {
    pub record_id: RecordId,
    /// Status from the authoritative flag.
    pub recorded: LendingStatus,
    /// Status implied by the latest check-in/check-out event.
    pub audited: LendingStatus,
    /// Sequence of that event; `None` when the record was never lent.
    pub last_status_event: Option<u64>,
}

/// Compares `record`'s flag with the latest status event in `events`.
///
/// `events` must be in log order; events for other records are ignored.
/// A record with no status events is expected to be available.
pub fn find_status_drift(
    record: &CatalogRecord,
    events: &[LifecycleEvent],
) -> Option<StatusDrift> {
    let last = events
        .iter()
        .rev()
        .find(|event| event.record_id == record.id && event.kind.is_status_transition());

    let audited = match last.map(|event| event.kind) {
        Some(LifecycleEventKind::CheckedOut) => LendingStatus::CheckedOut,
        _ => LendingStatus::Available,
    };
    let recorded = LendingStatus::of(record);

    if recorded == audited {
        return None;
    }

    Some(StatusDrift {
        record_id: record.id,
        recorded,
        audited,
        last_status_event: last.map(|event| event.sequence),
    })
}

#[cfg(test)]
mod tests {
    use super::{find_status_drift, LendingStatus};
    use crate::model::event::{LifecycleEvent, LifecycleEventKind};
    use crate::model::record::{CatalogRecord, RecordDraft};

    fn event(sequence: u64, kind: LifecycleEventKind, record_id: u64) -> LifecycleEvent {
        LifecycleEvent {
            sequence,
            kind,
            record_id,
            recorded_at_ms: 0,
        }
    }

    fn record(id: u64, checked_out: bool) -> CatalogRecord {
        let mut record = CatalogRecord::from_draft(id, &RecordDraft::default());
        record.checked_out = checked_out;
        record
    }

    #[test]
    fn no_status_events_means_available() {
        let events = vec![event(1, LifecycleEventKind::Added, 1)];
        assert_eq!(find_status_drift(&record(1, false), &events), None);

        let drift = find_status_drift(&record(1, true), &events).unwrap();
        assert_eq!(drift.recorded, LendingStatus::CheckedOut);
        assert_eq!(drift.audited, LendingStatus::Available);
        assert_eq!(drift.last_status_event, None);
    }

    #[test]
    fn latest_status_event_wins_and_other_records_are_ignored() {
        let events = vec![
            event(1, LifecycleEventKind::CheckedOut, 1),
            event(2, LifecycleEventKind::CheckedIn, 1),
            event(3, LifecycleEventKind::CheckedOut, 2),
            event(4, LifecycleEventKind::Removed, 1),
        ];
        assert_eq!(find_status_drift(&record(1, false), &events), None);

        let drift = find_status_drift(&record(1, true), &events).unwrap();
        assert_eq!(drift.audited, LendingStatus::Available);
        assert_eq!(drift.last_status_event, Some(2));
    }
}
