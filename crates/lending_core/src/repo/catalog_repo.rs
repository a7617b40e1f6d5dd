//! Catalog repository contract and store-backed implementation.
//!
//! # Responsibility
//! - Provide CRUD and status-transition APIs over the `catalog_records`
//!   partition.
//!
//! # Invariants
//! - Keys are 8-byte big-endian record ids, so scans return ascending ids.
//! - Ids come from the partition sequence and are never reused.
//! - `update` never resurrects a deleted id.
//! - Read paths reject a stored record whose `id` disagrees with its key.

use crate::model::record::{CatalogRecord, RecordDraft, RecordId};
use crate::repo::{RepoError, RepoResult};
use crate::store::keys::{decode_u64, encode_u64};
use crate::store::{ReadOps, Store, WriteTx};

/// Partition holding catalog records.
pub const CATALOG_PARTITION: &str = "catalog_records";

/// Repository interface for catalog records.
pub trait CatalogRepository {
    /// All records, ascending by id. Empty when the catalog is empty.
    fn list_all(&self) -> RepoResult<Vec<CatalogRecord>>;
    fn get_by_id(&self, id: RecordId) -> RepoResult<CatalogRecord>;
    /// Mints a new id and stores an available record.
    fn create(&self, draft: &RecordDraft) -> RepoResult<CatalogRecord>;
    /// Replaces every field of an existing record.
    fn update(&self, record: &CatalogRecord) -> RepoResult<()>;
    /// Removes the record if present. Returns whether one was removed.
    fn delete(&self, id: RecordId) -> RepoResult<bool>;
    fn check_in(&self, id: RecordId) -> RepoResult<()>;
    fn check_out(&self, id: RecordId) -> RepoResult<()>;
}

/// Catalog repository backed by a `Store`.
pub struct StoreCatalogRepository<'store> {
    store: &'store Store,
}

impl<'store> StoreCatalogRepository<'store> {
    /// Constructs a repository, creating the catalog partition if needed.
    pub fn try_new(store: &'store Store) -> RepoResult<Self> {
        store.ensure_partition(CATALOG_PARTITION)?;
        Ok(Self { store })
    }

    fn set_checked_out(&self, id: RecordId, checked_out: bool) -> RepoResult<()> {
        self.store.update(|tx| {
            let mut record = load_required(&*tx, id)?;
            record.checked_out = checked_out;
            put_record(tx, &record)
        })
    }
}

impl CatalogRepository for StoreCatalogRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<CatalogRecord>> {
        self.store.view(|tx| {
            tx.scan(CATALOG_PARTITION)?
                .into_iter()
                .map(|entry| decode_record(&entry.key, &entry.value))
                .collect()
        })
    }

    fn get_by_id(&self, id: RecordId) -> RepoResult<CatalogRecord> {
        self.store.view(|tx| load_required(tx, id))
    }

    fn create(&self, draft: &RecordDraft) -> RepoResult<CatalogRecord> {
        self.store.update(|tx| {
            let id = tx.next_sequence(CATALOG_PARTITION)?;
            let record = CatalogRecord::from_draft(id, draft);
            put_record(tx, &record)?;
            Ok(record)
        })
    }

    fn update(&self, record: &CatalogRecord) -> RepoResult<()> {
        self.store.update(|tx| {
            if tx.get(CATALOG_PARTITION, &encode_u64(record.id))?.is_none() {
                return Err(RepoError::NotFound(record.id));
            }
            put_record(tx, record)
        })
    }

    fn delete(&self, id: RecordId) -> RepoResult<bool> {
        self.store
            .update(|tx| Ok(tx.delete(CATALOG_PARTITION, &encode_u64(id))?))
    }

    fn check_in(&self, id: RecordId) -> RepoResult<()> {
        self.set_checked_out(id, false)
    }

    fn check_out(&self, id: RecordId) -> RepoResult<()> {
        self.set_checked_out(id, true)
    }
}

fn load_required(tx: &impl ReadOps, id: RecordId) -> RepoResult<CatalogRecord> {
    let key = encode_u64(id);
    match tx.get(CATALOG_PARTITION, &key)? {
        Some(value) => decode_record(&key, &value),
        None => Err(RepoError::NotFound(id)),
    }
}

fn put_record(tx: &mut WriteTx<'_>, record: &CatalogRecord) -> RepoResult<()> {
    let value = serde_json::to_vec(record).map_err(|err| {
        RepoError::Encode(format!("catalog record {}: {err}", record.id))
    })?;
    tx.put(CATALOG_PARTITION, &encode_u64(record.id), &value)?;
    Ok(())
}

fn decode_record(key: &[u8], value: &[u8]) -> RepoResult<CatalogRecord> {
    let key_id = decode_u64(key)
        .map_err(|err| RepoError::Decode(format!("catalog key: {err}")))?;
    let record: CatalogRecord = serde_json::from_slice(value).map_err(|err| {
        RepoError::Decode(format!("catalog record at key {key_id}: {err}"))
    })?;
    if record.id != key_id {
        return Err(RepoError::Decode(format!(
            "catalog record at key {key_id} carries id {}",
            record.id
        )));
    }
    Ok(record)
}
