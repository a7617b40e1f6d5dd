//! Lifecycle event log contract and store-backed implementation.
//!
//! # Responsibility
//! - Append one immutable event per catalog state transition.
//! - Return events in chronological (append) order.
//!
//! # Invariants
//! - The log is append-only: no update or delete API exists.
//! - Keys are 8-byte big-endian sequence numbers from the partition counter,
//!   so two events captured in the same millisecond never collide.
//! - `list_for_record` is a full scan filtered by record id; cost grows with
//!   the total number of events.

use crate::model::event::{LifecycleEvent, LifecycleEventKind};
use crate::model::record::RecordId;
use crate::repo::{RepoError, RepoResult};
use crate::store::keys::{decode_u64, encode_u64};
use crate::store::{Entry, ReadOps, Store};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Partition holding lifecycle events.
pub const EVENTS_PARTITION: &str = "lifecycle_events";

/// Source of event timestamps.
pub trait Clock {
    /// Current time in Unix epoch milliseconds.
    fn now_epoch_ms(&self) -> i64;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        // A clock set before 1970 records as the epoch rather than failing the
        // append.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
            })
    }
}

/// Repository interface for the lifecycle event log.
pub trait EventLogRepository {
    /// Appends one event of `kind` for `record_id` in its own transaction.
    fn append(&self, kind: LifecycleEventKind, record_id: RecordId)
        -> RepoResult<LifecycleEvent>;
    /// Every event, oldest first.
    fn list_all(&self) -> RepoResult<Vec<LifecycleEvent>>;
    /// Events referencing `record_id`, oldest first.
    fn list_for_record(&self, record_id: RecordId) -> RepoResult<Vec<LifecycleEvent>>;

    fn record_added(&self, record_id: RecordId) -> RepoResult<LifecycleEvent> {
        self.append(LifecycleEventKind::Added, record_id)
    }

    fn record_removed(&self, record_id: RecordId) -> RepoResult<LifecycleEvent> {
        self.append(LifecycleEventKind::Removed, record_id)
    }

    fn record_checked_in(&self, record_id: RecordId) -> RepoResult<LifecycleEvent> {
        self.append(LifecycleEventKind::CheckedIn, record_id)
    }

    fn record_checked_out(&self, record_id: RecordId) -> RepoResult<LifecycleEvent> {
        self.append(LifecycleEventKind::CheckedOut, record_id)
    }
}

/// Stored shape of an event; the sequence lives in the key.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEvent {
    kind: LifecycleEventKind,
    record_id: RecordId,
    recorded_at_ms: i64,
}

/// Event log backed by a `Store`.
pub struct StoreEventLog<'store, C: Clock = SystemClock> {
    store: &'store Store,
    clock: C,
}

impl<'store> StoreEventLog<'store, SystemClock> {
    /// Constructs an event log stamped by the system clock.
    pub fn try_new(store: &'store Store) -> RepoResult<Self> {
        Self::with_clock(store, SystemClock)
    }
}

impl<'store, C: Clock> StoreEventLog<'store, C> {
    /// Constructs an event log with a caller-provided time source.
    pub fn with_clock(store: &'store Store, clock: C) -> RepoResult<Self> {
        store.ensure_partition(EVENTS_PARTITION)?;
        Ok(Self { store, clock })
    }
}

impl<C: Clock> EventLogRepository for StoreEventLog<'_, C> {
    fn append(
        &self,
        kind: LifecycleEventKind,
        record_id: RecordId,
    ) -> RepoResult<LifecycleEvent> {
        self.store.update(|tx| {
            let sequence = tx.next_sequence(EVENTS_PARTITION)?;
            let stored = StoredEvent {
                kind,
                record_id,
                recorded_at_ms: self.clock.now_epoch_ms(),
            };
            let value = serde_json::to_vec(&stored)
                .map_err(|err| RepoError::Encode(format!("lifecycle event {sequence}: {err}")))?;
            tx.put(EVENTS_PARTITION, &encode_u64(sequence), &value)?;
            Ok(to_event(sequence, stored))
        })
    }

    fn list_all(&self) -> RepoResult<Vec<LifecycleEvent>> {
        self.store.view(|tx| {
            tx.scan(EVENTS_PARTITION)?
                .iter()
                .map(decode_event)
                .collect()
        })
    }

    fn list_for_record(&self, record_id: RecordId) -> RepoResult<Vec<LifecycleEvent>> {
        self.store.view(|tx| {
            let mut events = Vec::new();
            for entry in tx.scan(EVENTS_PARTITION)? {
                let event = decode_event(&entry)?;
                if event.record_id == record_id {
                    events.push(event);
                }
            }
            Ok(events)
        })
    }
}

fn decode_event(entry: &Entry) -> RepoResult<LifecycleEvent> {
    let sequence = decode_u64(&entry.key)
        .map_err(|err| RepoError::Decode(format!("lifecycle event key: {err}")))?;
    let stored: StoredEvent = serde_json::from_slice(&entry.value)
        .map_err(|err| RepoError::Decode(format!("lifecycle event {sequence}: {err}")))?;
    Ok(to_event(sequence, stored))
}

fn to_event(sequence: u64, stored: StoredEvent) -> LifecycleEvent {
    LifecycleEvent {
        sequence,
        kind: stored.kind,
        record_id: stored.record_id,
        recorded_at_ms: stored.recorded_at_ms,
    }
}
