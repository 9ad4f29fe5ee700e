//! Configuration for a transfer.

use crate::error::{EngineError, EngineResult};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Connection string used when no source connection string is given.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Destination connection string meaning "same as the source".
pub const SAME_AS_SOURCE: &str = "*";

/// Number of upserts sent per bulk write by default.
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

/// File name prefix of audit files.
pub const DEFAULT_AUDIT_PREFIX: &str = "mirror";

/// What to do with documents that exist only in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// No snapshot, no reconciliation.
    #[default]
    None,
    /// Report destination-only identifiers without deleting anything.
    Test,
    /// Report, then delete destination-only documents.
    Delete,
}

impl MirrorMode {
    /// Returns true if the destination must be snapshotted.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MirrorMode::None)
    }

    /// Returns true if destination-only documents are deleted.
    pub fn deletes(&self) -> bool {
        matches!(self, MirrorMode::Delete)
    }
}

impl FromStr for MirrorMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(MirrorMode::None),
            "test" => Ok(MirrorMode::Test),
            "delete" => Ok(MirrorMode::Delete),
            _ => Err(EngineError::InvalidMirrorMode(s.to_string())),
        }
    }
}

impl fmt::Display for MirrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MirrorMode::None => "none",
            MirrorMode::Test => "test",
            MirrorMode::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// A collection on a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    /// Connection string.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Collection name.
    pub collection: String,
}

impl CollectionRef {
    /// Creates a collection reference.
    pub fn new(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Returns true if both references point at the same collection.
    ///
    /// Comparison ignores ASCII case, so `Orders` and `orders` on the same
    /// server count as the same collection.
    pub fn same_collection(&self, other: &CollectionRef) -> bool {
        self.uri.trim().eq_ignore_ascii_case(other.uri.trim())
            && self.database.eq_ignore_ascii_case(&other.database)
            && self.collection.eq_ignore_ascii_case(&other.collection)
    }

    /// `database.collection`.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace())
    }
}

/// Raw source and destination settings, as given on the command line.
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    /// Source connection string; [`DEFAULT_URI`] if absent.
    pub source_uri: Option<String>,
    /// Source database.
    pub source_database: String,
    /// Source collection.
    pub source_collection: String,
    /// Destination connection string; [`SAME_AS_SOURCE`] reuses the source.
    pub destination_uri: String,
    /// Destination database; the source database if absent.
    pub destination_database: Option<String>,
    /// Destination collection; the source collection if absent. Required
    /// when the destination connection string is [`SAME_AS_SOURCE`] or
    /// equal to the source one.
    pub destination_collection: Option<String>,
}

impl Endpoints {
    /// Resolves defaults and the same-as-source sentinel.
    ///
    /// Does not check whether both ends are the same collection; that is
    /// [`TransferConfig::validate`]'s job.
    pub fn resolve(self) -> EngineResult<(CollectionRef, CollectionRef)> {
        let source_uri = nullify(self.source_uri).unwrap_or_else(|| DEFAULT_URI.to_string());
        let destination_collection = nullify(self.destination_collection);

        let destination_uri = if self.destination_uri.trim() == SAME_AS_SOURCE {
            source_uri.clone()
        } else {
            self.destination_uri
        };
        if destination_collection.is_none()
            && destination_uri.trim().eq_ignore_ascii_case(source_uri.trim())
        {
            return Err(EngineError::MissingDestinationCollection);
        }

        let destination_database =
            nullify(self.destination_database).unwrap_or_else(|| self.source_database.clone());
        let destination_collection =
            destination_collection.unwrap_or_else(|| self.source_collection.clone());

        Ok((
            CollectionRef::new(source_uri, self.source_database, self.source_collection),
            CollectionRef::new(destination_uri, destination_database, destination_collection),
        ))
    }
}

fn nullify(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Configuration for a transfer.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Collection read from.
    pub source: CollectionRef,
    /// Collection written to.
    pub destination: CollectionRef,
    /// Upserts per bulk write.
    pub batch_size: usize,
    /// Mirror mode.
    pub mirror_mode: MirrorMode,
    /// Directory audit files are written to.
    pub audit_dir: PathBuf,
    /// File name prefix of audit files.
    pub audit_prefix: String,
}

impl TransferConfig {
    /// Creates a configuration with default batch size, no mirroring, and
    /// audit files in the working directory.
    pub fn new(source: CollectionRef, destination: CollectionRef) -> Self {
        Self {
            source,
            destination,
            batch_size: DEFAULT_BATCH_SIZE,
            mirror_mode: MirrorMode::None,
            audit_dir: PathBuf::from("."),
            audit_prefix: DEFAULT_AUDIT_PREFIX.to_string(),
        }
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Sets the mirror mode.
    pub fn with_mirror_mode(mut self, mode: MirrorMode) -> Self {
        self.mirror_mode = mode;
        self
    }

    /// Sets the audit directory.
    pub fn with_audit_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.audit_dir = dir.into();
        self
    }

    /// Sets the audit file prefix.
    pub fn with_audit_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.audit_prefix = prefix.into();
        self
    }

    /// Checks the configuration. Performs no I/O.
    pub fn validate(&self) -> EngineResult<()> {
        if self.batch_size == 0 {
            return Err(EngineError::InvalidBatchSize(self.batch_size));
        }
        if self.source.same_collection(&self.destination) {
            return Err(EngineError::SameCollection {
                collection: self.source.namespace(),
            });
        }
        Ok(())
    }
}
