//! # MongoTransfer Engine
//!
//! Batched upsert and mirror reconciliation engine.
//!
//! This crate provides:
//! - Transfer configuration and validation
//! - Destination identifier snapshot
//! - Batched upsert of every source document
//! - Mirror reconciliation (none, test, delete)
//! - Audit files of identifier sets
//!
//! ## Architecture
//!
//! A transfer is a sequential pipeline:
//! 1. Snapshot destination identifiers (mirror modes only)
//! 2. Stream the source and upsert in fixed-size batches, crossing each
//!    source identifier off the snapshot
//! 3. Report or delete what is left of the snapshot
//!
//! ## Key Invariants
//!
//! - Source and destination are never the same collection
//! - A batch is flushed exactly when full; the last partial batch once
//! - One store call in flight at a time
//! - Upserts are idempotent; nothing is retried or rolled back
//! - The residual audit file is written before anything is deleted

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod config;
mod engine;
mod error;
mod reconciler;
pub mod snapshot;
pub mod upserter;

pub use audit::{AuditWriter, RESIDUAL_SUFFIX, SNAPSHOT_SUFFIX};
pub use config::{
    CollectionRef, Endpoints, MirrorMode, TransferConfig, DEFAULT_AUDIT_PREFIX, DEFAULT_BATCH_SIZE,
    DEFAULT_URI, SAME_AS_SOURCE,
};
pub use engine::{TransferEngine, TransferPhase, TransferReport};
pub use error::{EngineError, EngineResult};
pub use reconciler::{MirrorReconciler, ReconcileOutcome};
pub use snapshot::Snapshot;
pub use upserter::{BatchUpserter, CopyStats};
