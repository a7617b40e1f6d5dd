//! Single-file durable ordered key-value store.
//!
//! # Responsibility
//! - Own the on-disk file and every byte written to it.
//! - Expose atomic read and read-write transactions over named partitions.
//! - Mint per-partition sequence numbers that are never reused.
//!
//! # Invariants
//! - At most one write transaction runs at a time per store handle.
//! - Read transactions observe a snapshot pinned when they begin.
//! - Iteration within a partition is ascending by raw key bytes.
//! - Migration version is tracked via `PRAGMA user_version`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod keys;
pub mod migrations;
mod open;
mod tx;

pub use open::{Store, StoreOptions};
pub use tx::{Entry, ReadOps, ReadTx, WriteTx};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    PartitionNotFound(String),
    InvalidPartitionName(String),
    EmptyKey,
    Corrupt(String),
    /// The file would not switch to WAL; carries the mode it reported.
    UnsupportedJournalMode(String),
    /// `Store::update` was called from inside a write closure on the same store.
    NestedWrite,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "store schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PartitionNotFound(name) => write!(f, "partition not found: `{name}`"),
            Self::InvalidPartitionName(name) => write!(f, "invalid partition name: `{name}`"),
            Self::EmptyKey => write!(f, "keys must not be empty"),
            Self::Corrupt(message) => write!(f, "corrupt store data: {message}"),
            Self::UnsupportedJournalMode(mode) => {
                write!(f, "store requires WAL journal mode, file reports `{mode}`")
            }
            Self::NestedWrite => write!(f, "write transaction already open on this thread"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::PartitionNotFound(_)
            | Self::InvalidPartitionName(_)
            | Self::EmptyKey
            | Self::Corrupt(_)
            | Self::UnsupportedJournalMode(_)
            | Self::NestedWrite => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
