//! Document store trait definition.

use crate::error::StoreResult;
use crate::identifier::Identifier;
use crate::operation::{BulkWriteSummary, WriteOp};
use bson::Document;

/// A lazy, single-pass sequence of documents.
pub type DocumentStream<'a> = Box<dyn Iterator<Item = StoreResult<Document>> + 'a>;

/// A lazy, single-pass sequence of document identifiers.
pub type IdentifierStream<'a> = Box<dyn Iterator<Item = StoreResult<Identifier>> + 'a>;

/// A collection of documents that can be scanned and bulk-written.
///
/// # Invariants
///
/// - `scan` yields every field of every document, with no filter, sort or
///   projection, in the store's natural order
/// - `scan_ids` yields the `_id` of every document and nothing else
/// - `bulk_write` applies the operations in order as one call and reports
///   success or failure for the call as a whole
/// - Calls block until the store has answered
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - `MongoStore` - A MongoDB collection
pub trait DocumentStore: Send + Sync {
    /// Human-readable location of the store, for logs.
    fn describe(&self) -> String;

    /// Starts a full read of the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the read cannot be started. Errors while
    /// advancing are yielded by the stream itself.
    fn scan(&self) -> StoreResult<DocumentStream<'_>>;

    /// Starts a projected read returning only identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the read cannot be started. A document without
    /// `_id` is yielded as [`crate::StoreError::MissingIdentifier`].
    fn scan_ids(&self) -> StoreResult<IdentifierStream<'_>>;

    /// Applies an ordered batch of operations in one call.
    ///
    /// An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the call. Operations of earlier
    /// calls stay applied.
    fn bulk_write(&self, operations: &[WriteOp]) -> StoreResult<BulkWriteSummary>;
}
