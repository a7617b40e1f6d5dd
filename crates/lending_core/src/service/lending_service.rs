//! Lending use-case service.
//!
//! # Responsibility
//! - Pair each catalog mutation with its lifecycle event append.
//! - Apply the configured audit policy when an append fails.
//!
//! # Invariants
//! - The catalog mutation and its event append are two separate store
//!   transactions; the mutation commits first.
//! - Lending status is always read from the record flag.

use crate::model::event::{LifecycleEvent, LifecycleEventKind};
use crate::model::record::{CatalogRecord, RecordDraft, RecordId};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::event_repo::EventLogRepository;
use crate::repo::RepoResult;
use crate::service::status::{find_status_drift, LendingStatus, StatusDrift};
use log::{info, warn};
use std::str::FromStr;

/// What to do when an event append fails after its catalog mutation committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuditPolicy {
    /// Log the failure and report the mutation as successful.
    #[default]
    BestEffort,
    /// Return the append error to the caller.
    Required,
}

impl FromStr for AuditPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" => Ok(Self::BestEffort),
            "required" => Ok(Self::Required),
            other => Err(format!(
                "unsupported audit policy `{other}`; expected best-effort|required"
            )),
        }
    }
}

/// Use-case service over a catalog repository and its event log.
pub struct LendingService<C: CatalogRepository, E: EventLogRepository> {
    catalog: C,
    events: E,
    audit: AuditPolicy,
}

impl<C: CatalogRepository, E: EventLogRepository> LendingService<C, E> {
    /// Creates a service with the best-effort audit policy.
    pub fn new(catalog: C, events: E) -> Self {
        Self::with_policy(catalog, events, AuditPolicy::default())
    }

    pub fn with_policy(catalog: C, events: E, audit: AuditPolicy) -> Self {
        Self {
            catalog,
            events,
            audit,
        }
    }

    pub fn audit_policy(&self) -> AuditPolicy {
        self.audit
    }

    pub fn list_records(&self) -> RepoResult<Vec<CatalogRecord>> {
        self.catalog.list_all()
    }

    pub fn get_record(&self, id: RecordId) -> RepoResult<CatalogRecord> {
        self.catalog.get_by_id(id)
    }

    /// Creates a record and logs `ADDED`.
    pub fn add_record(&self, draft: &RecordDraft) -> RepoResult<CatalogRecord> {
        let record = self.catalog.create(draft)?;
        info!("event=record_add module=service status=ok record_id={}", record.id);
        self.audit(LifecycleEventKind::Added, record.id)?;
        Ok(record)
    }

    /// Replaces a record's fields. Edits are not lifecycle events.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when the record does not exist.
    pub fn edit_record(&self, record: &CatalogRecord) -> RepoResult<()> {
        self.catalog.update(record)
    }

    /// Deletes a record; logs `REMOVED` only when a record was actually removed.
    ///
    /// Returns whether a record was removed.
    pub fn remove_record(&self, id: RecordId) -> RepoResult<bool> {
        let removed = self.catalog.delete(id)?;
        if removed {
            info!("event=record_remove module=service status=ok record_id={id}");
            self.audit(LifecycleEventKind::Removed, id)?;
        }
        Ok(removed)
    }

    pub fn check_in(&self, id: RecordId) -> RepoResult<()> {
        self.catalog.check_in(id)?;
        self.audit(LifecycleEventKind::CheckedIn, id)
    }

    pub fn check_out(&self, id: RecordId) -> RepoResult<()> {
        self.catalog.check_out(id)?;
        self.audit(LifecycleEventKind::CheckedOut, id)
    }

    /// Lending status of one record, from its flag.
    pub fn lending_status(&self, id: RecordId) -> RepoResult<LendingStatus> {
        let record = self.catalog.get_by_id(id)?;
        Ok(LendingStatus::of(&record))
    }

    /// Event history of one record, oldest first.
    pub fn history(&self, id: RecordId) -> RepoResult<Vec<LifecycleEvent>> {
        self.events.list_for_record(id)
    }

    /// Whole event log, oldest first.
    pub fn activity(&self) -> RepoResult<Vec<LifecycleEvent>> {
        self.events.list_all()
    }

    /// Records whose flag disagrees with their audit trail, ascending by id.
    ///
    /// Reads the catalog and the log once each.
    pub fn status_drift(&self) -> RepoResult<Vec<StatusDrift>> {
        let records = self.catalog.list_all()?;
        let events = self.events.list_all()?;
        Ok(records
            .iter()
            .filter_map(|record| find_status_drift(record, &events))
            .collect())
    }

    fn audit(&self, kind: LifecycleEventKind, id: RecordId) -> RepoResult<()> {
        match self.events.append(kind, id) {
            Ok(_) => Ok(()),
            Err(err) => match self.audit {
                AuditPolicy::BestEffort => {
                    warn!(
                        "event=audit_append module=service status=error policy=best_effort kind={} record_id={} error={}",
                        kind, id, err
                    );
                    Ok(())
                }
                AuditPolicy::Required => Err(err),
            },
        }
    }
}
