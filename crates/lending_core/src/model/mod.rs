//! Catalog domain model.
//!
//! # Responsibility
//! - Define the catalog record and the lifecycle events recorded about it.
//!
//! # Invariants
//! - Every catalog record is identified by a `RecordId` minted once and never
//!   reused, even after the record is deleted.
//! - Deletion is a hard delete; history survives only in the event log.

pub mod event;
pub mod record;
