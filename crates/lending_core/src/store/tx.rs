//! Transaction views over the store file.
//!
//! # Invariants
//! - Every partition operation fails with `PartitionNotFound` unless the
//!   partition was ensured first.
//! - Scans are ascending by raw key bytes (SQLite compares BLOBs with memcmp).
//! - Sequence counters only move forward; deleting entries never rewinds them.

use super::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// One key/value pair returned by a partition scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Read operations shared by read-only and read-write transactions.
pub trait ReadOps {
    /// Returns the value stored at `key`, or `None`.
    fn get(&self, partition: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Returns every entry whose key is `>= start`, ascending by key bytes.
    fn scan_from(&self, partition: &str, start: &[u8]) -> StoreResult<Vec<Entry>>;

    /// Returns whether partition `name` exists.
    fn partition_exists(&self, name: &str) -> StoreResult<bool>;

    /// Number of entries stored in `partition`.
    fn count(&self, partition: &str) -> StoreResult<u64>;

    /// Returns every entry in `partition`, ascending by key bytes.
    fn scan(&self, partition: &str) -> StoreResult<Vec<Entry>> {
        self.scan_from(partition, &[])
    }
}

/// Snapshot-isolated read transaction.
pub struct ReadTx<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> ReadTx<'conn> {
    pub(super) fn begin(conn: &'conn mut Connection) -> StoreResult<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        // A deferred transaction takes its WAL snapshot on first read; do that
        // now so the snapshot is as old as the transaction.
        tx.query_row("SELECT COUNT(*) FROM partitions;", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(Self { tx })
    }

    pub(super) fn finish(self) -> StoreResult<()> {
        self.tx.rollback()?;
        Ok(())
    }

    pub(super) fn partition_names(&self) -> StoreResult<Vec<String>> {
        partition_names(&self.tx)
    }
}

impl ReadOps for ReadTx<'_> {
    fn get(&self, partition: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        get_entry(&self.tx, partition, key)
    }

    fn scan_from(&self, partition: &str, start: &[u8]) -> StoreResult<Vec<Entry>> {
        scan_entries(&self.tx, partition, start)
    }

    fn partition_exists(&self, name: &str) -> StoreResult<bool> {
        partition_exists(&self.tx, name)
    }

    fn count(&self, partition: &str) -> StoreResult<u64> {
        count_entries(&self.tx, partition)
    }
}

/// Exclusive read-write transaction.
///
/// Reads inside a write transaction observe its own uncommitted mutations.
pub struct WriteTx<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> WriteTx<'conn> {
    pub(super) fn new(tx: Transaction<'conn>) -> Self {
        Self { tx }
    }

    pub(super) fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    pub(super) fn rollback(self) -> StoreResult<()> {
        self.tx.rollback()?;
        Ok(())
    }

    /// Creates partition `name` with its sequence at zero; no-op if present.
    pub fn ensure_partition(&mut self, name: &str) -> StoreResult<()> {
        validate_partition_name(name)?;
        self.tx.execute(
            "INSERT INTO partitions (name, sequence) VALUES (?1, 0)
             ON CONFLICT(name) DO NOTHING;",
            [name],
        )?;
        Ok(())
    }

    /// Stores `value` at `key`, replacing any previous value.
    pub fn put(&mut self, partition: &str, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        require_partition(&self.tx, partition)?;
        self.tx.execute(
            "INSERT INTO entries (partition, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(partition, key) DO UPDATE SET value = excluded.value;",
            params![partition, key, value],
        )?;
        Ok(())
    }

    /// Removes the entry at exactly `key`.
    ///
    /// Returns whether an entry was present.
    pub fn delete(&mut self, partition: &str, key: &[u8]) -> StoreResult<bool> {
        require_partition(&self.tx, partition)?;
        let removed = self.tx.execute(
            "DELETE FROM entries WHERE partition = ?1 AND key = ?2;",
            params![partition, key],
        )?;
        Ok(removed > 0)
    }

    /// Draws the next value of the partition's sequence counter.
    ///
    /// The first call on a partition returns 1.
    pub fn next_sequence(&mut self, partition: &str) -> StoreResult<u64> {
        let next = self
            .tx
            .query_row(
                "UPDATE partitions SET sequence = sequence + 1
                 WHERE name = ?1
                 RETURNING sequence;",
                [partition],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::PartitionNotFound(partition.to_string()))?;

        u64::try_from(next).map_err(|_| {
            StoreError::Corrupt(format!(
                "negative sequence `{next}` in partition `{partition}`"
            ))
        })
    }
}

impl ReadOps for WriteTx<'_> {
    fn get(&self, partition: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        get_entry(&self.tx, partition, key)
    }

    fn scan_from(&self, partition: &str, start: &[u8]) -> StoreResult<Vec<Entry>> {
        scan_entries(&self.tx, partition, start)
    }

    fn partition_exists(&self, name: &str) -> StoreResult<bool> {
        partition_exists(&self.tx, name)
    }

    fn count(&self, partition: &str) -> StoreResult<u64> {
        count_entries(&self.tx, partition)
    }
}

fn validate_partition_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidPartitionName(name.to_string()));
    }
    Ok(())
}

fn partition_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM partitions WHERE name = ?1);",
        [name],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn require_partition(conn: &Connection, name: &str) -> StoreResult<()> {
    if partition_exists(conn, name)? {
        Ok(())
    } else {
        Err(StoreError::PartitionNotFound(name.to_string()))
    }
}

fn partition_names(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name ASC;")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn get_entry(conn: &Connection, partition: &str, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
    require_partition(conn, partition)?;
    let value = conn
        .query_row(
            "SELECT value FROM entries WHERE partition = ?1 AND key = ?2;",
            params![partition, key],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()?;
    Ok(value)
}

fn scan_entries(conn: &Connection, partition: &str, start: &[u8]) -> StoreResult<Vec<Entry>> {
    require_partition(conn, partition)?;
    // An empty `start` binds as a zero-length blob, which sorts before every key.
    let mut stmt = conn.prepare(
        "SELECT key, value FROM entries
         WHERE partition = ?1 AND key >= ?2
         ORDER BY key ASC;",
    )?;
    let mut rows = stmt.query(params![partition, start])?;
    let mut entries = Vec::new();

    while let Some(row) = rows.next()? {
        entries.push(Entry {
            key: row.get(0)?,
            value: row.get(1)?,
        });
    }

    Ok(entries)
}

fn count_entries(conn: &Connection, partition: &str) -> StoreResult<u64> {
    require_partition(conn, partition)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE partition = ?1;",
        [partition],
        |row| row.get(0),
    )?;
    u64::try_from(count)
        .map_err(|_| StoreError::Corrupt(format!("negative entry count `{count}`")))
}
