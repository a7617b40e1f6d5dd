//! Repository layer contracts and store-backed implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the catalog and its
//!   event log.
//! - Keep partition names, key layout and value encoding inside the core.
//!
//! # Invariants
//! - Each repository operation runs as exactly one store transaction.
//! - Repository APIs return semantic errors (`NotFound`, `Decode`) in
//!   addition to store transport errors, and never swallow either.

use crate::model::record::RecordId;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_repo;
pub mod event_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error returned by catalog and event log repositories.
#[derive(Debug)]
pub enum RepoError {
    /// I/O or transaction failure; the transaction was rolled back.
    Store(StoreError),
    /// No record is stored under the id.
    NotFound(RecordId),
    /// Stored bytes do not match the expected shape.
    Decode(String),
    /// A value could not be serialized for storage.
    Encode(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "catalog record not found: {id}"),
            Self::Decode(message) => write!(f, "invalid persisted data: {message}"),
            Self::Encode(message) => write!(f, "cannot encode value: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::Decode(_) | Self::Encode(_) => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
