//! Mirror reconciliation of destination-only documents.

use crate::audit::{AuditWriter, RESIDUAL_SUFFIX};
use crate::config::MirrorMode;
use crate::error::EngineResult;
use mongotransfer_store::{DeleteOperation, DocumentStore, IdentifierSet, WriteOp};
use std::path::PathBuf;
use tracing::info;

/// What reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Mirror mode is `none`.
    Skipped,
    /// Nothing exists only in the destination; no audit file written.
    AlreadyMirrored,
    /// Destination-only identifiers were written to an audit file.
    Reported {
        /// Audit file listing the residual identifiers.
        audit_file: PathBuf,
        /// Number of residual identifiers.
        residual: usize,
    },
    /// Destination-only documents were audited, then deleted.
    Deleted {
        /// Audit file listing the residual identifiers.
        audit_file: PathBuf,
        /// Number of residual identifiers.
        residual: usize,
        /// Documents the destination reported as deleted.
        deleted: u64,
    },
}

impl ReconcileOutcome {
    /// The residual audit file, if one was written.
    pub fn audit_file(&self) -> Option<&PathBuf> {
        match self {
            ReconcileOutcome::Reported { audit_file, .. }
            | ReconcileOutcome::Deleted { audit_file, .. } => Some(audit_file),
            _ => None,
        }
    }
}

/// Acts on the identifiers left over after the copy.
pub struct MirrorReconciler<'a, D: DocumentStore + ?Sized> {
    destination: &'a D,
    audit: &'a AuditWriter,
}

impl<'a, D: DocumentStore + ?Sized> MirrorReconciler<'a, D> {
    /// Creates a reconciler.
    pub fn new(destination: &'a D, audit: &'a AuditWriter) -> Self {
        Self { destination, audit }
    }

    /// Reports or deletes the residual identifiers according to `mode`.
    ///
    /// In delete mode the audit file is written before anything is deleted,
    /// and all deletes go out as one bulk write.
    pub fn reconcile(
        &self,
        mode: MirrorMode,
        residual: &IdentifierSet,
    ) -> EngineResult<ReconcileOutcome> {
        if !mode.is_enabled() {
            return Ok(ReconcileOutcome::Skipped);
        }

        if residual.is_empty() {
            info!(
                "No document existed in the output collection and not in the input collection, mirror is implicit"
            );
            return Ok(ReconcileOutcome::AlreadyMirrored);
        }

        let count = residual.len();
        let audit_file = self.audit.write(residual, RESIDUAL_SUFFIX)?;
        info!(
            count,
            path = %audit_file.display(),
            "{count} document(s) exist in the output collection and not in the input collection"
        );

        if !mode.deletes() {
            info!("Test mode, nothing was deleted");
            return Ok(ReconcileOutcome::Reported {
                audit_file,
                residual: count,
            });
        }

        let operations: Vec<WriteOp> = residual
            .iter()
            .map(|id| WriteOp::Delete(DeleteOperation::new(id.clone())))
            .collect();
        let summary = self.destination.bulk_write(&operations)?;
        info!(
            deleted = summary.deleted,
            "Delete mode, {} document(s) have been deleted from the output collection",
            summary.deleted
        );

        Ok(ReconcileOutcome::Deleted {
            audit_file,
            residual: count,
            deleted: summary.deleted,
        })
    }
}
