//! Transfer pipeline: snapshot, copy, reconcile.

use crate::audit::AuditWriter;
use crate::config::TransferConfig;
use crate::error::EngineResult;
use crate::reconciler::{MirrorReconciler, ReconcileOutcome};
use crate::snapshot::{self, Snapshot};
use crate::upserter::{self, CopyStats};
use mongotransfer_store::DocumentStore;
use parking_lot::RwLock;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// The phase a transfer is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Not started.
    Idle,
    /// Checking the configuration.
    Validating,
    /// Reading destination identifiers.
    Snapshotting,
    /// Upserting source documents into the destination.
    Copying,
    /// Reporting or deleting destination-only documents.
    Reconciling,
    /// Finished successfully.
    Completed,
    /// Stopped on an error.
    Failed,
}

impl TransferPhase {
    /// Returns true while the transfer is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TransferPhase::Validating
                | TransferPhase::Snapshotting
                | TransferPhase::Copying
                | TransferPhase::Reconciling
        )
    }

    /// Returns true once the transfer has stopped, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferPhase::Completed | TransferPhase::Failed)
    }
}

/// Result of a transfer.
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Copy phase counters.
    pub copy: CopyStats,
    /// Destination identifiers captured before the copy (mirror modes).
    pub snapshot_size: usize,
    /// Audit file of the destination snapshot, if one was written.
    pub snapshot_audit: Option<PathBuf>,
    /// What reconciliation did.
    pub reconcile: ReconcileOutcome,
    /// Wall-clock duration of the whole run.
    pub elapsed: Duration,
}

/// Moves every document of a source store into a destination store.
///
/// The run is a sequential pipeline with one store call in flight at a
/// time:
/// 1. validate the configuration (no I/O)
/// 2. snapshot destination identifiers, if mirroring
/// 3. upsert every source document in fixed-size batches
/// 4. report or delete destination-only documents, if mirroring
///
/// Nothing is rolled back on failure. Batches written before an error stay
/// written; re-running is safe because upserts are idempotent.
pub struct TransferEngine<S: DocumentStore, D: DocumentStore> {
    config: TransferConfig,
    source: S,
    destination: D,
    phase: RwLock<TransferPhase>,
}

impl<S: DocumentStore, D: DocumentStore> TransferEngine<S, D> {
    /// Creates an engine.
    pub fn new(config: TransferConfig, source: S, destination: D) -> Self {
        Self {
            config,
            source,
            destination,
            phase: RwLock::new(TransferPhase::Idle),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// The source store.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The destination store.
    pub fn destination(&self) -> &D {
        &self.destination
    }

    /// The current phase.
    pub fn phase(&self) -> TransferPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: TransferPhase) {
        *self.phase.write() = phase;
    }

    /// Runs the transfer.
    pub fn run(&self) -> EngineResult<TransferReport> {
        let start = Instant::now();
        match self.run_phases(start) {
            Ok(report) => {
                self.set_phase(TransferPhase::Completed);
                info!(
                    documents = report.copy.documents_written,
                    batches = report.copy.batches_written,
                    elapsed = ?report.elapsed,
                    "transfer completed"
                );
                Ok(report)
            }
            Err(err) => {
                error!(phase = ?self.phase(), error = %err, "transfer failed");
                self.set_phase(TransferPhase::Failed);
                Err(err)
            }
        }
    }

    fn run_phases(&self, start: Instant) -> EngineResult<TransferReport> {
        self.set_phase(TransferPhase::Validating);
        self.config.validate()?;

        let mode = self.config.mirror_mode;
        let audit = AuditWriter::new(&self.config.audit_dir).with_prefix(&self.config.audit_prefix);
        info!(
            source = %self.source.describe(),
            destination = %self.destination.describe(),
            mirror = %mode,
            batch_size = self.config.batch_size,
            "starting transfer"
        );

        let mut snapshot = if mode.is_enabled() {
            self.set_phase(TransferPhase::Snapshotting);
            Some(snapshot::capture(&self.destination, &audit)?)
        } else {
            None
        };

        self.set_phase(TransferPhase::Copying);
        let copy = upserter::copy_all(
            &self.source,
            &self.destination,
            self.config.batch_size,
            snapshot.as_mut().map(|s| &mut s.ids),
        )?;

        let reconcile = match &snapshot {
            Some(snapshot) => {
                self.set_phase(TransferPhase::Reconciling);
                MirrorReconciler::new(&self.destination, &audit).reconcile(mode, &snapshot.ids)?
            }
            None => ReconcileOutcome::Skipped,
        };

        let Snapshot {
            captured,
            audit_file,
            ..
        } = snapshot.unwrap_or_default();

        Ok(TransferReport {
            copy,
            snapshot_size: captured,
            snapshot_audit: audit_file,
            reconcile,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionRef, MirrorMode, DEFAULT_URI};
    use crate::error::EngineError;
    use mongotransfer_store::{doc, InMemoryStore};
    use tempfile::tempdir;

    fn config() -> TransferConfig {
        TransferConfig::new(
            CollectionRef::new(DEFAULT_URI, "db", "source"),
            CollectionRef::new(DEFAULT_URI, "db", "destination"),
        )
    }

    #[test]
    fn phase_checks() {
        assert!(TransferPhase::Copying.is_active());
        assert!(!TransferPhase::Idle.is_active());
        assert!(TransferPhase::Completed.is_terminal());
        assert!(TransferPhase::Failed.is_terminal());
        assert!(!TransferPhase::Reconciling.is_terminal());
    }

    #[test]
    fn engine_initial_phase() {
        let engine = TransferEngine::new(config(), InMemoryStore::new(), InMemoryStore::new());
        assert_eq!(engine.phase(), TransferPhase::Idle);
    }

    #[test]
    fn engine_completes() {
        let dir = tempdir().unwrap();
        let engine = TransferEngine::new(
            config().with_audit_dir(dir.path()),
            InMemoryStore::with_documents([doc! { "_id": 1 }]),
            InMemoryStore::new(),
        );

        let report = engine.run().unwrap();
        assert_eq!(engine.phase(), TransferPhase::Completed);
        assert_eq!(report.copy.documents_written, 1);
        assert_eq!(report.reconcile, ReconcileOutcome::Skipped);
        assert!(report.snapshot_audit.is_none());
    }

    #[test]
    fn invalid_config_touches_no_store() {
        let dir = tempdir().unwrap();
        let same = CollectionRef::new(DEFAULT_URI, "db", "coll");
        let destination = InMemoryStore::with_documents([doc! { "_id": 9 }]);
        destination.fail_writes_after(0);

        let engine = TransferEngine::new(
            TransferConfig::new(same.clone(), same)
                .with_mirror_mode(MirrorMode::Delete)
                .with_audit_dir(dir.path()),
            InMemoryStore::with_documents([doc! { "_id": 1 }]),
            destination,
        );

        let err = engine.run().unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(engine.phase(), TransferPhase::Failed);
        assert!(engine.destination().write_calls().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failure_marks_phase() {
        let dir = tempdir().unwrap();
        let destination = InMemoryStore::new();
        destination.fail_writes_after(0);

        let engine = TransferEngine::new(
            config().with_audit_dir(dir.path()),
            InMemoryStore::with_documents([doc! { "_id": 1 }]),
            destination,
        );

        assert!(matches!(engine.run(), Err(EngineError::Store(_))));
        assert_eq!(engine.phase(), TransferPhase::Failed);
    }
}
