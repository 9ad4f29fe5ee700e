//! Batched upsert of source documents into the destination.

use crate::error::{EngineError, EngineResult};
use mongotransfer_store::{Document, DocumentStore, IdentifierSet, UpsertOperation, WriteOp};
use tracing::{info, warn};

/// Counters for the copy phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    /// Documents read from the source.
    pub documents_read: u64,
    /// Documents delivered to the destination.
    pub documents_written: u64,
    /// Bulk writes issued.
    pub batches_written: u64,
    /// Upserts that inserted a new document.
    pub inserted: u64,
    /// Upserts that matched an existing document.
    pub matched: u64,
    /// Matched documents whose content changed.
    pub modified: u64,
}

/// Accumulates upserts and flushes them in fixed-size batches.
///
/// A batch is flushed exactly when it reaches `batch_size`; `finish`
/// flushes the remaining partial batch. Batches go out in the order their
/// documents were pushed, one bulk write at a time.
pub struct BatchUpserter<'a, D: DocumentStore + ?Sized> {
    destination: &'a D,
    batch_size: usize,
    pending: Vec<WriteOp>,
    stats: CopyStats,
}

impl<'a, D: DocumentStore + ?Sized> BatchUpserter<'a, D> {
    /// Creates an upserter. `batch_size` must be at least one.
    pub fn new(destination: &'a D, batch_size: usize) -> EngineResult<Self> {
        if batch_size == 0 {
            return Err(EngineError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            destination,
            batch_size,
            // Capped so a huge configured batch does not allocate up front.
            pending: Vec::with_capacity(batch_size.min(4096)),
            stats: CopyStats::default(),
        })
    }

    /// Queues an upsert for `document`, flushing if the batch is full.
    ///
    /// The document's identifier is removed from `residual` when one is
    /// given: it is still present in the source.
    pub fn push(
        &mut self,
        document: Document,
        residual: Option<&mut IdentifierSet>,
    ) -> EngineResult<()> {
        self.stats.documents_read += 1;
        let op = UpsertOperation::from_document(document).map_err(|_| {
            EngineError::MissingIdentifier {
                ordinal: self.stats.documents_read,
            }
        })?;

        if let Some(residual) = residual {
            residual.remove(op.id());
        }
        self.pending.push(WriteOp::Upsert(op));

        if self.pending.len() == self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Number of queued, unflushed upserts.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Counters so far.
    pub fn stats(&self) -> CopyStats {
        self.stats
    }

    /// Flushes the final partial batch and returns the counters.
    pub fn finish(mut self) -> EngineResult<CopyStats> {
        if !self.pending.is_empty() {
            self.flush()?;
        }
        Ok(self.stats)
    }

    fn flush(&mut self) -> EngineResult<()> {
        let count = self.pending.len();
        info!(count, "Writing {count} document(s)");

        let summary = match self.destination.bulk_write(&self.pending) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(
                    destination = %self.destination.describe(),
                    batches_committed = self.stats.batches_written,
                    documents_committed = self.stats.documents_written,
                    "bulk write failed, destination is partially migrated"
                );
                return Err(err.into());
            }
        };

        self.stats.batches_written += 1;
        self.stats.documents_written += count as u64;
        self.stats.inserted += summary.upserted;
        self.stats.matched += summary.matched;
        self.stats.modified += summary.modified;
        self.pending.clear();
        Ok(())
    }
}

/// Copies every source document into the destination.
///
/// Drains the source scan through a [`BatchUpserter`], removing each
/// source identifier from `residual` along the way.
pub fn copy_all<S, D>(
    source: &S,
    destination: &D,
    batch_size: usize,
    mut residual: Option<&mut IdentifierSet>,
) -> EngineResult<CopyStats>
where
    S: DocumentStore + ?Sized,
    D: DocumentStore + ?Sized,
{
    let mut upserter = BatchUpserter::new(destination, batch_size)?;
    for document in source.scan()? {
        upserter.push(document?, residual.as_deref_mut())?;
    }
    upserter.finish()
}
