//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading from or writing to a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// Advancing a read cursor failed.
    #[error("cursor error: {0}")]
    Cursor(String),

    /// A bulk write was rejected as a whole.
    #[error("bulk write failed: {message}")]
    BulkWrite {
        /// Server or backend message.
        message: String,
        /// Number of operations in the rejected call.
        operations: usize,
    },

    /// A document returned by the store has no `_id` field.
    #[error("document returned by {store} has no _id field")]
    MissingIdentifier {
        /// Store description.
        store: String,
    },

    /// A document could not be encoded for the wire.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A fault injected by a test backend.
    #[error("injected fault: {0}")]
    Fault(String),

    /// MongoDB driver error.
    #[cfg(feature = "mongo")]
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
