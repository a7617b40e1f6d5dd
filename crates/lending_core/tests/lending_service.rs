use lending_core::{
    AuditPolicy, CatalogRepository, EventLogRepository, LendingService, LendingStatus,
    LifecycleEvent, LifecycleEventKind, RecordDraft, RecordId, RepoError, RepoResult, Store,
    StoreCatalogRepository, StoreError, StoreEventLog,
};
use tempfile::TempDir;

/// Event log double whose appends always fail.
struct FailingEventLog;

impl EventLogRepository for FailingEventLog {
    fn append(
        &self,
        _kind: LifecycleEventKind,
        _record_id: RecordId,
    ) -> RepoResult<LifecycleEvent> {
        Err(RepoError::Store(StoreError::Corrupt(
            "simulated append fault".to_string(),
        )))
    }

    fn list_all(&self) -> RepoResult<Vec<LifecycleEvent>> {
        Ok(Vec::new())
    }

    fn list_for_record(&self, _record_id: RecordId) -> RepoResult<Vec<LifecycleEvent>> {
        Ok(Vec::new())
    }
}

fn open_temp_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("lending.db")).unwrap();
    (dir, store)
}

fn service(store: &Store) -> LendingService<StoreCatalogRepository<'_>, StoreEventLog<'_>> {
    LendingService::new(
        StoreCatalogRepository::try_new(store).unwrap(),
        StoreEventLog::try_new(store).unwrap(),
    )
}

fn draft() -> RecordDraft {
    RecordDraft::new("Kindred", "Octavia E. Butler", "9780807083697", "")
}

fn kinds(events: &[LifecycleEvent]) -> Vec<LifecycleEventKind> {
    events.iter().map(|event| event.kind).collect()
}

#[test]
fn add_record_logs_added() {
    let (_dir, store) = open_temp_store();
    let service = service(&store);

    let record = service.add_record(&draft()).unwrap();
    assert_eq!(service.get_record(record.id).unwrap(), record);
    assert_eq!(
        kinds(&service.history(record.id).unwrap()),
        vec![LifecycleEventKind::Added]
    );
}

#[test]
fn check_out_then_check_in_appends_one_event_each() {
    let (_dir, store) = open_temp_store();
    let service = service(&store);
    let record = service.add_record(&draft()).unwrap();

    service.check_out(record.id).unwrap();
    assert!(service.get_record(record.id).unwrap().checked_out);
    assert_eq!(
        service.lending_status(record.id).unwrap(),
        LendingStatus::CheckedOut
    );

    service.check_in(record.id).unwrap();
    assert!(!service.get_record(record.id).unwrap().checked_out);

    assert_eq!(
        kinds(&service.history(record.id).unwrap()),
        vec![
            LifecycleEventKind::Added,
            LifecycleEventKind::CheckedOut,
            LifecycleEventKind::CheckedIn,
        ]
    );
}

#[test]
fn failed_transition_logs_nothing() {
    let (_dir, store) = open_temp_store();
    let service = service(&store);

    assert!(matches!(
        service.check_out(11).unwrap_err(),
        RepoError::NotFound(11)
    ));
    assert!(service.activity().unwrap().is_empty());
}

#[test]
fn edit_record_does_not_log_and_rejects_missing_records() {
    let (_dir, store) = open_temp_store();
    let service = service(&store);
    let mut record = service.add_record(&draft()).unwrap();

    record.description = "Time-travel novel.".to_string();
    service.edit_record(&record).unwrap();
    assert_eq!(service.get_record(record.id).unwrap(), record);
    assert_eq!(service.history(record.id).unwrap().len(), 1);

    service.remove_record(record.id).unwrap();
    assert!(matches!(
        service.edit_record(&record).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn remove_logs_only_when_a_record_was_removed() {
    let (_dir, store) = open_temp_store();
    let service = service(&store);
    let record = service.add_record(&draft()).unwrap();

    assert!(service.remove_record(record.id).unwrap());
    assert!(!service.remove_record(record.id).unwrap());

    assert_eq!(
        kinds(&service.history(record.id).unwrap()),
        vec![LifecycleEventKind::Added, LifecycleEventKind::Removed]
    );
    assert!(matches!(
        service.get_record(record.id).unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn best_effort_policy_keeps_mutation_when_append_fails() {
    let (_dir, store) = open_temp_store();
    let service = LendingService::new(
        StoreCatalogRepository::try_new(&store).unwrap(),
        FailingEventLog,
    );
    assert_eq!(service.audit_policy(), AuditPolicy::BestEffort);

    let record = service.add_record(&draft()).unwrap();
    service.check_out(record.id).unwrap();

    assert!(service.get_record(record.id).unwrap().checked_out);
}

#[test]
fn required_policy_returns_append_error_after_commit() {
    let (_dir, store) = open_temp_store();
    let catalog = StoreCatalogRepository::try_new(&store).unwrap();
    let record = catalog.create(&draft()).unwrap();

    let service =
        LendingService::with_policy(catalog, FailingEventLog, AuditPolicy::Required);
    let err = service.check_out(record.id).unwrap_err();
    assert!(matches!(err, RepoError::Store(StoreError::Corrupt(_))));

    // The catalog write is its own transaction and has already committed.
    assert!(service.get_record(record.id).unwrap().checked_out);
}

#[test]
fn status_drift_reports_flag_without_matching_event() {
    let (_dir, store) = open_temp_store();
    let service = service(&store);

    let tracked = service.add_record(&draft()).unwrap();
    service.check_out(tracked.id).unwrap();
    assert!(service.status_drift().unwrap().is_empty());

    // Mutate the flag behind the service's back, as a lost append would.
    let untracked = service.add_record(&draft()).unwrap();
    StoreCatalogRepository::try_new(&store)
        .unwrap()
        .check_out(untracked.id)
        .unwrap();

    let drift = service.status_drift().unwrap();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].record_id, untracked.id);
    assert_eq!(drift[0].recorded, LendingStatus::CheckedOut);
    assert_eq!(drift[0].audited, LendingStatus::Available);

    // Reads still follow the flag.
    assert_eq!(
        service.lending_status(untracked.id).unwrap(),
        LendingStatus::CheckedOut
    );
}

#[test]
fn audit_policy_parses_from_text() {
    assert_eq!(
        "best-effort".parse::<AuditPolicy>().unwrap(),
        AuditPolicy::BestEffort
    );
    assert_eq!(
        " Required ".parse::<AuditPolicy>().unwrap(),
        AuditPolicy::Required
    );
    assert!("strict".parse::<AuditPolicy>().is_err());
}
