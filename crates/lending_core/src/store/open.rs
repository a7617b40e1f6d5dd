//! Store handle: connection bootstrap and transaction entry points.
//!
//! # Responsibility
//! - Open the store file and configure connection pragmas.
//! - Trigger schema migrations before returning a usable handle.
//! - Serialize writers and pool snapshot readers.
//!
//! # Invariants
//! - Every connection runs in WAL mode with `synchronous=FULL`.
//! - Reader connections are `query_only`.
//! - A write closure that returns `Err` leaves no trace in the file.

use super::migrations::apply_migrations;
use super::tx::{ReadTx, WriteTx};
use super::{StoreError, StoreResult};
use log::{debug, error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_MAX_IDLE_READERS: usize = 4;

/// Tunables applied when a store is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long a connection waits on a lock held by another process.
    pub busy_timeout: Duration,
    /// Reader connections kept open between read transactions.
    pub max_idle_readers: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_idle_readers: DEFAULT_MAX_IDLE_READERS,
        }
    }
}

/// Handle to one store file.
///
/// Share it by reference (or behind an `Arc`) between repositories; it is
/// `Send + Sync`.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    options: StoreOptions,
    writer: Mutex<Connection>,
    /// Thread holding `writer`, for nested-write detection.
    write_owner: Mutex<Option<ThreadId>>,
    idle_readers: Mutex<Vec<Connection>>,
}

impl Store {
    /// Opens (creating if needed) the store file at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_options(path, StoreOptions::default())
    }

    /// Opens the store file at `path` and applies all pending migrations.
    ///
    /// # Side effects
    /// - Creates the file when missing.
    /// - Emits `store_open` logging events with duration and status.
    pub fn open_with_options(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let started_at = Instant::now();
        info!(
            "event=store_open module=store status=start path={}",
            path.display()
        );

        match open_writer(&path, &options) {
            Ok(writer) => {
                info!(
                    "event=store_open module=store status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    path,
                    options,
                    writer: Mutex::new(writer),
                    write_owner: Mutex::new(None),
                    idle_readers: Mutex::new(Vec::new()),
                })
            }
            Err(err) => {
                error!(
                    "event=store_open module=store status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `f` against a consistent snapshot.
    ///
    /// Many reads may run at once, alongside one write. Writes committed after
    /// the snapshot was taken are not visible inside `f`.
    pub fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut conn = self.checkout_reader()?;
        let result = {
            let tx = ReadTx::begin(&mut conn)?;
            let result = f(&tx);
            tx.finish()?;
            result
        };
        self.return_reader(conn);
        result
    }

    /// Runs `f` with exclusive write access to the whole store.
    ///
    /// Commits when `f` returns `Ok`; otherwise every mutation made inside `f`
    /// is discarded. The commit is durable before this returns.
    ///
    /// The writer lock is not reentrant: calling `update` (or any repository
    /// write on this store) from inside `f` fails with
    /// `StoreError::NestedWrite` instead of deadlocking. Use the `WriteTx`
    /// passed to `f` for further writes.
    pub fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let current = thread::current().id();
        if *self.write_owner.lock().unwrap_or_else(PoisonError::into_inner) == Some(current) {
            return Err(StoreError::NestedWrite.into());
        }

        // A poisoned guard still holds a usable connection: the panicking
        // transaction was rolled back when it was dropped.
        let mut conn = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let mut write = WriteTx::new(tx);
        let _owner = WriteOwner::claim(&self.write_owner, current);

        match f(&mut write) {
            Ok(value) => {
                write.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = write.rollback() {
                    warn!(
                        "event=store_rollback module=store status=error error={}",
                        rollback_err
                    );
                } else {
                    debug!("event=store_rollback module=store status=ok");
                }
                Err(err)
            }
        }
    }

    /// Creates partition `name` unless it already exists.
    pub fn ensure_partition(&self, name: &str) -> StoreResult<()> {
        self.update(|tx| tx.ensure_partition(name))
    }

    /// Names of all partitions, ascending.
    pub fn partitions(&self) -> StoreResult<Vec<String>> {
        self.view(|tx| tx.partition_names())
    }

    fn checkout_reader(&self) -> StoreResult<Connection> {
        let pooled = self
            .idle_readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match pooled {
            Some(conn) => Ok(conn),
            None => open_reader(&self.path, &self.options),
        }
    }

    fn return_reader(&self, conn: Connection) {
        let mut idle = self
            .idle_readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.options.max_idle_readers {
            idle.push(conn);
        }
    }
}

/// Records the thread holding the writer; cleared on drop, including unwind.
struct WriteOwner<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> WriteOwner<'a> {
    fn claim(slot: &'a Mutex<Option<ThreadId>>, thread: ThreadId) -> Self {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread);
        Self { slot }
    }
}

impl Drop for WriteOwner<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn open_writer(path: &Path, options: &StoreOptions) -> StoreResult<Connection> {
    let mut conn = Connection::open(path)?;
    conn.busy_timeout(options.busy_timeout)?;
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !journal_mode.eq_ignore_ascii_case("wal") {
        return Err(StoreError::UnsupportedJournalMode(journal_mode));
    }
    conn.pragma_update(None, "synchronous", "FULL")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn open_reader(path: &Path, options: &StoreOptions) -> StoreResult<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(options.busy_timeout)?;
    conn.execute_batch("PRAGMA query_only = ON;")?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::{open_writer, StoreOptions};
    use crate::store::StoreError;
    use std::path::Path;

    #[test]
    fn file_without_wal_support_reports_journal_mode() {
        let err = open_writer(Path::new(":memory:"), &StoreOptions::default()).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedJournalMode(mode) if mode == "memory"));
    }
}
