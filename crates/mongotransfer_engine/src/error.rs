//! Error types for the transfer engine.

use mongotransfer_store::StoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while configuring or running a transfer.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The destination shares the source connection but names no collection.
    #[error("same connection strings and output collection unspecified")]
    MissingDestinationCollection,

    /// Source and destination resolve to the same collection.
    #[error("source and destination are the same collection: {collection}")]
    SameCollection {
        /// The collection, as `database.collection`.
        collection: String,
    },

    /// Batch size must be at least one.
    #[error("invalid batch size: {0}")]
    InvalidBatchSize(usize),

    /// Mirror mode string not recognized.
    #[error("invalid mirror mode '{0}', expected none, test or delete")]
    InvalidMirrorMode(String),

    /// A source document has no `_id` field.
    #[error("source document #{ordinal} has no _id field")]
    MissingIdentifier {
        /// 1-based position of the document in the source scan.
        ordinal: u64,
    },

    /// Store error while reading or writing.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Audit file could not be written.
    #[error("cannot write audit file {path:?}: {source}")]
    Audit {
        /// Path of the audit file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Audit content could not be encoded.
    #[error("cannot encode audit file: {0}")]
    AuditEncode(#[from] serde_json::Error),
}

impl EngineError {
    /// Returns true if this error was detected before any I/O.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::MissingDestinationCollection
                | EngineError::SameCollection { .. }
                | EngineError::InvalidBatchSize(_)
                | EngineError::InvalidMirrorMode(_)
        )
    }
}
