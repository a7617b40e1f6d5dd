//! Persistence core for a lending-library catalog.
//!
//! A single-file ordered key-value store, the catalog and lifecycle-event
//! repositories built on it, and the service that keeps the two in step.

pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging};
pub use model::event::{LifecycleEvent, LifecycleEventKind};
pub use model::record::{CatalogRecord, RecordDraft, RecordId};
pub use repo::catalog_repo::{CatalogRepository, StoreCatalogRepository, CATALOG_PARTITION};
pub use repo::event_repo::{
    Clock, EventLogRepository, StoreEventLog, SystemClock, EVENTS_PARTITION,
};
pub use repo::{RepoError, RepoResult};
pub use service::lending_service::{AuditPolicy, LendingService};
pub use service::status::{find_status_drift, LendingStatus, StatusDrift};
pub use store::{Store, StoreError, StoreOptions, StoreResult};
