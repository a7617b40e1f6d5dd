//! Catalog record model.
//!
//! # Invariants
//! - `id` is positive and immutable after creation.
//! - `checked_out` is the authoritative lending status (see
//!   `service::status`).

use serde::{Deserialize, Serialize};

/// Identifier of a catalog record, drawn from the catalog sequence counter.
///
/// Starts at 1; zero is never assigned.
pub type RecordId = u64;

/// One lendable item in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    /// External identifier such as an ISBN. Not unique.
    pub identifier: String,
    pub description: String,
    /// Mutable mirror of lending status.
    pub checked_out: bool,
}

impl CatalogRecord {
    /// Builds a freshly created record from a draft. New records are available.
    pub fn from_draft(id: RecordId, draft: &RecordDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            author: draft.author.clone(),
            identifier: draft.identifier.clone(),
            description: draft.description.clone(),
            checked_out: false,
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.checked_out
    }
}

/// Field values for a record that has not been assigned an id yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub title: String,
    pub author: String,
    pub identifier: String,
    pub description: String,
}

impl RecordDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        identifier: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            identifier: identifier.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogRecord, RecordDraft};

    #[test]
    fn from_draft_starts_available() {
        let draft = RecordDraft::new("Dune", "Frank Herbert", "9780441013593", "");
        let record = CatalogRecord::from_draft(7, &draft);
        assert_eq!(record.id, 7);
        assert_eq!(record.title, "Dune");
        assert!(!record.is_checked_out());
    }
}
