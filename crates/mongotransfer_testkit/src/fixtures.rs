//! Test fixtures.
//!
//! Seeded stores and a temporary directory for audit files.

use mongotransfer_store::{doc, Bson, Document, Identifier, IdentifierSet, InMemoryStore};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A document `{ _id: id, name: "doc-<id>", payload: { n: id } }`.
pub fn doc_with_id(id: i32) -> Document {
    doc! {
        "_id": id,
        "name": format!("doc-{id}"),
        "payload": { "n": id },
    }
}

/// Documents for each identifier, in the given order.
pub fn documents(ids: impl IntoIterator<Item = i32>) -> Vec<Document> {
    ids.into_iter().map(doc_with_id).collect()
}

/// An in-memory store holding [`doc_with_id`] for each identifier.
pub fn store_with_ids(name: &str, ids: impl IntoIterator<Item = i32>) -> InMemoryStore {
    let store = InMemoryStore::named(name);
    for document in documents(ids) {
        store.insert(document);
    }
    store
}

/// An identifier set of `Int32` identifiers.
pub fn id_set(ids: impl IntoIterator<Item = i32>) -> IdentifierSet {
    ids.into_iter().map(Identifier::new).collect()
}

/// A temporary directory for audit files, removed on drop.
pub struct AuditDir {
    dir: TempDir,
}

impl AuditDir {
    /// Creates a fresh empty directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Files in the directory, sorted by name.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(self.dir.path())
            .expect("Failed to list audit directory")
            .map(|entry| entry.expect("Failed to read directory entry").path())
            .collect();
        files.sort();
        files
    }
}

impl Default for AuditDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads an audit file of integer identifiers.
pub fn read_int_audit(path: &Path) -> BTreeSet<i64> {
    let content = std::fs::read_to_string(path).expect("Failed to read audit file");
    serde_json::from_str::<Vec<i64>>(&content)
        .expect("Audit file is not a JSON array of integers")
        .into_iter()
        .collect()
}

/// `Int32` and `Int64` identifiers of an in-memory store as sorted integers.
pub fn int_ids(store: &InMemoryStore) -> BTreeSet<i64> {
    store
        .ids()
        .iter()
        .filter_map(|id| match id.value() {
            Bson::Int32(n) => Some(i64::from(*n)),
            Bson::Int64(n) => Some(*n),
            _ => None,
        })
        .collect()
}
