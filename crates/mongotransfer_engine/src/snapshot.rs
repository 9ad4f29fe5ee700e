//! Destination identifier snapshot.

use crate::audit::{AuditWriter, SNAPSHOT_SUFFIX};
use crate::error::EngineResult;
use mongotransfer_store::{DocumentStore, IdentifierSet};
use std::path::PathBuf;
use tracing::{debug, info};

/// Identifiers present in the destination before the copy.
///
/// The set is owned here and lent to the upserter, which removes every
/// identifier it sees in the source. What is left afterwards exists only
/// in the destination.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Destination identifiers not (yet) seen in the source.
    pub ids: IdentifierSet,
    /// Number of identifiers captured.
    pub captured: usize,
    /// Audit file listing the captured identifiers, if any were captured.
    pub audit_file: Option<PathBuf>,
}

/// Reads every destination identifier and audits the result.
///
/// A non-empty snapshot is written to an audit file before returning. An
/// empty one produces no file.
pub fn capture<D>(destination: &D, audit: &AuditWriter) -> EngineResult<Snapshot>
where
    D: DocumentStore + ?Sized,
{
    let mut ids = IdentifierSet::new();
    for id in destination.scan_ids()? {
        let id = id?;
        if !ids.insert(id) {
            debug!(store = %destination.describe(), "duplicate identifier in snapshot");
        }
    }

    let captured = ids.len();
    if ids.is_empty() {
        info!(
            store = %destination.describe(),
            "No document exists in the output collection, no audit file written"
        );
        return Ok(Snapshot::default());
    }

    let path = audit.write(&ids, SNAPSHOT_SUFFIX)?;
    info!(
        store = %destination.describe(),
        count = captured,
        path = %path.display(),
        "{captured} document(s) exist in the output collection"
    );

    Ok(Snapshot {
        ids,
        captured,
        audit_file: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use mongotransfer_store::{doc, Identifier, InMemoryStore, StoreError};
    use tempfile::tempdir;

    #[test]
    fn captures_all_identifiers() {
        let dir = tempdir().unwrap();
        let store = InMemoryStore::with_documents([
            doc! { "_id": 2, "v": "b" },
            doc! { "_id": 3, "v": "c" },
            doc! { "_id": 4, "v": "d" },
        ]);

        let snapshot = capture(&store, &AuditWriter::new(dir.path())).unwrap();
        assert_eq!(snapshot.captured, 3);
        assert!(snapshot.ids.contains(&Identifier::new(4)));

        let path = snapshot.audit_file.unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        let mut listed: Vec<i32> = serde_json::from_str(&content).unwrap();
        listed.sort();
        assert_eq!(listed, vec![2, 3, 4]);
    }

    #[test]
    fn empty_destination_writes_no_file() {
        let dir = tempdir().unwrap();
        let snapshot = capture(&InMemoryStore::new(), &AuditWriter::new(dir.path())).unwrap();

        assert!(snapshot.ids.is_empty());
        assert!(snapshot.audit_file.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn identifier_read_failure_aborts() {
        let dir = tempdir().unwrap();
        let store = InMemoryStore::with_documents([doc! { "_id": 1 }, doc! { "v": 1 }]);

        let err = capture(&store, &AuditWriter::new(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Store(StoreError::MissingIdentifier { .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
