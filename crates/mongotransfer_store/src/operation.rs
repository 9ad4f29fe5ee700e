//! Write operations accepted by [`crate::DocumentStore::bulk_write`].

use crate::identifier::Identifier;
use bson::Document;

/// Replace-or-insert of a whole document, selected by its `_id`.
///
/// The only way to build one is from the replacement document itself, so
/// the filter identifier always equals the document's identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOperation {
    id: Identifier,
    replacement: Document,
}

impl UpsertOperation {
    /// Builds an upsert for `document`.
    ///
    /// Returns the document back if it has no `_id` field.
    pub fn from_document(document: Document) -> Result<Self, Document> {
        match Identifier::of(&document) {
            Some(id) => Ok(Self {
                id,
                replacement: document,
            }),
            None => Err(document),
        }
    }

    /// The identifier selected by the filter.
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// The `{ _id: <id> }` filter.
    pub fn filter(&self) -> Document {
        self.id.filter()
    }

    /// The full replacement document.
    pub fn replacement(&self) -> &Document {
        &self.replacement
    }

    /// Always true: a missing document is created.
    pub fn upsert(&self) -> bool {
        true
    }
}

/// Deletion of a single document, selected by its `_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOperation {
    id: Identifier,
}

impl DeleteOperation {
    /// Builds a delete for the given identifier.
    pub fn new(id: Identifier) -> Self {
        Self { id }
    }

    /// The identifier selected by the filter.
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// The `{ _id: <id> }` filter.
    pub fn filter(&self) -> Document {
        self.id.filter()
    }
}

/// One operation of an ordered bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace the document with the same `_id`, inserting it if absent.
    Upsert(UpsertOperation),
    /// Delete the document with the given `_id`.
    Delete(DeleteOperation),
}

impl WriteOp {
    /// The identifier this operation targets.
    pub fn id(&self) -> &Identifier {
        match self {
            WriteOp::Upsert(op) => op.id(),
            WriteOp::Delete(op) => op.id(),
        }
    }

    /// Returns true for an upsert.
    pub fn is_upsert(&self) -> bool {
        matches!(self, WriteOp::Upsert(_))
    }
}

/// Counts reported by a store for one bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteSummary {
    /// Upserts that matched an existing document.
    pub matched: u64,
    /// Matched documents whose content actually changed.
    pub modified: u64,
    /// Upserts that inserted a new document.
    pub upserted: u64,
    /// Documents removed by delete operations.
    pub deleted: u64,
}

impl BulkWriteSummary {
    /// Adds the counts of another summary to this one.
    pub fn merge(&mut self, other: BulkWriteSummary) {
        self.matched += other.matched;
        self.modified += other.modified;
        self.upserted += other.upserted;
        self.deleted += other.deleted;
    }
}
