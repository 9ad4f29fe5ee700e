//! In-memory document store for testing.

use crate::error::{StoreError, StoreResult};
use crate::identifier::{Identifier, IdentifierSet};
use crate::operation::{BulkWriteSummary, WriteOp};
use crate::store::{DocumentStore, DocumentStream, IdentifierStream};
use bson::Document;
use parking_lot::RwLock;

/// Kind of operations carried by one recorded bulk call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Only upserts.
    Upsert,
    /// Only deletes.
    Delete,
    /// Both upserts and deletes.
    Mixed,
}

/// A bulk call that was applied to an [`InMemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteCall {
    /// Operation kind.
    pub kind: WriteKind,
    /// Number of operations in the call.
    pub len: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    // Documents in insertion order, with their identifier cached.
    documents: Vec<(Option<Identifier>, Document)>,
    calls: Vec<WriteCall>,
    fail_writes_after: Option<usize>,
    fail_scan_after: Option<usize>,
}

impl MemoryState {
    fn position(&self, id: &Identifier) -> Option<usize> {
        self.documents
            .iter()
            .position(|(doc_id, _)| doc_id.as_ref() == Some(id))
    }

    fn put(&mut self, id: Option<Identifier>, document: Document) -> Option<Document> {
        let existing = id.as_ref().and_then(|id| self.position(id));
        match existing {
            Some(index) => Some(std::mem::replace(&mut self.documents[index].1, document)),
            None => {
                self.documents.push((id, document));
                None
            }
        }
    }
}

/// An in-memory document store.
///
/// Documents keep their insertion order, which is the order `scan` yields
/// them in. Intended for:
/// - Unit and integration tests of the engine
/// - Fault injection (failing scans and bulk writes on demand)
/// - Inspecting exactly which bulk calls were made
///
/// # Thread Safety
///
/// All state sits behind a lock, so the store is driven through `&self`
/// like a real collection.
///
/// # Example
///
/// ```rust
/// use bson::doc;
/// use mongotransfer_store::{DocumentStore, InMemoryStore};
///
/// let store = InMemoryStore::with_documents([doc! { "_id": 1 }, doc! { "_id": 2 }]);
/// let ids: Vec<_> = store.scan_ids().unwrap().collect::<Result<_, _>>().unwrap();
/// assert_eq!(ids.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    name: String,
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Creates an empty store with a name used by `describe`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Creates a store pre-populated with documents.
    ///
    /// A document whose `_id` is already present replaces the earlier one.
    /// Documents without `_id` are kept as-is.
    #[must_use]
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let store = Self::new();
        for document in documents {
            store.insert(document);
        }
        store
    }

    /// Inserts or replaces a document without recording a bulk call.
    pub fn insert(&self, document: Document) {
        let id = Identifier::of(&document);
        self.state.write().put(id, document);
    }

    /// Returns a copy of all documents in store order.
    #[must_use]
    pub fn documents(&self) -> Vec<Document> {
        self.state
            .read()
            .documents
            .iter()
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    /// Returns the document with the given identifier.
    #[must_use]
    pub fn get(&self, id: &Identifier) -> Option<Document> {
        let state = self.state.read();
        state.position(id).map(|index| state.documents[index].1.clone())
    }

    /// Returns the identifiers of all documents that have one.
    #[must_use]
    pub fn ids(&self) -> IdentifierSet {
        self.state
            .read()
            .documents
            .iter()
            .filter_map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    /// Returns true if the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().documents.is_empty()
    }

    /// Returns the bulk calls applied so far, in order.
    #[must_use]
    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.state.read().calls.clone()
    }

    /// Lets the next `calls` bulk writes succeed and fails every one after.
    pub fn fail_writes_after(&self, calls: usize) {
        let mut state = self.state.write();
        state.fail_writes_after = Some(state.calls.len() + calls);
    }

    /// Makes every scan fail after yielding `documents` documents.
    pub fn fail_scan_after(&self, documents: usize) {
        self.state.write().fail_scan_after = Some(documents);
    }

    /// Removes any injected fault.
    pub fn clear_faults(&self) {
        let mut state = self.state.write();
        state.fail_writes_after = None;
        state.fail_scan_after = None;
    }
}

impl DocumentStore for InMemoryStore {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn scan(&self) -> StoreResult<DocumentStream<'_>> {
        let (documents, fail_after) = {
            let state = self.state.read();
            let documents: Vec<_> = state.documents.iter().map(|(_, doc)| doc.clone()).collect();
            (documents, state.fail_scan_after)
        };

        let stream = documents.into_iter().map(Ok);
        match fail_after {
            Some(limit) => Ok(Box::new(stream.take(limit).chain(std::iter::once(Err(
                StoreError::Fault(format!("scan of {} interrupted after {limit} documents", self.name)),
            ))))),
            None => Ok(Box::new(stream)),
        }
    }

    fn scan_ids(&self) -> StoreResult<IdentifierStream<'_>> {
        let ids: Vec<_> = self
            .state
            .read()
            .documents
            .iter()
            .map(|(id, _)| id.clone())
            .collect();

        let store = self.describe();
        Ok(Box::new(ids.into_iter().map(move |id| {
            id.ok_or_else(|| StoreError::MissingIdentifier {
                store: store.clone(),
            })
        })))
    }

    fn bulk_write(&self, operations: &[WriteOp]) -> StoreResult<BulkWriteSummary> {
        let mut summary = BulkWriteSummary::default();
        if operations.is_empty() {
            return Ok(summary);
        }

        let mut state = self.state.write();
        if let Some(limit) = state.fail_writes_after {
            if state.calls.len() >= limit {
                return Err(StoreError::BulkWrite {
                    message: format!("injected failure on {}", self.name),
                    operations: operations.len(),
                });
            }
        }

        for operation in operations {
            match operation {
                WriteOp::Upsert(op) => {
                    let replacement = op.replacement().clone();
                    match state.put(Some(op.id().clone()), replacement) {
                        Some(previous) => {
                            summary.matched += 1;
                            if &previous != op.replacement() {
                                summary.modified += 1;
                            }
                        }
                        None => summary.upserted += 1,
                    }
                }
                WriteOp::Delete(op) => {
                    if let Some(index) = state.position(op.id()) {
                        state.documents.remove(index);
                        summary.deleted += 1;
                    }
                }
            }
        }

        let upserts = operations.iter().filter(|op| op.is_upsert()).count();
        let kind = match upserts {
            0 => WriteKind::Delete,
            n if n == operations.len() => WriteKind::Upsert,
            _ => WriteKind::Mixed,
        };
        state.calls.push(WriteCall {
            kind,
            len: operations.len(),
        });

        Ok(summary)
    }
}
