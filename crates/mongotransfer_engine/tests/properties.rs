//! Property tests for batching and mirror reconciliation.

use mongotransfer_engine::{
    AuditWriter, CollectionRef, MirrorMode, ReconcileOutcome, TransferConfig, TransferEngine,
    DEFAULT_URI, SNAPSHOT_SUFFIX,
};
use mongotransfer_store::{IdentifierSet, InMemoryStore, WriteKind};
use mongotransfer_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn engine(
    audit: &AuditDir,
    source: &BTreeSet<i32>,
    destination: &BTreeSet<i32>,
    batch_size: usize,
    mode: MirrorMode,
) -> TransferEngine<InMemoryStore, InMemoryStore> {
    let config = TransferConfig::new(
        CollectionRef::new(DEFAULT_URI, "db", "source"),
        CollectionRef::new(DEFAULT_URI, "db", "destination"),
    )
    .with_batch_size(batch_size)
    .with_mirror_mode(mode)
    .with_audit_dir(audit.path());

    TransferEngine::new(
        config,
        store_with_ids("source", source.iter().copied()),
        store_with_ids("destination", destination.iter().copied()),
    )
}

fn widen(ids: &BTreeSet<i32>) -> BTreeSet<i64> {
    ids.iter().map(|id| i64::from(*id)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn batches_follow_size(
        ids in id_values_strategy(48),
        batch_size in batch_size_strategy(),
    ) {
        let audit = AuditDir::new();
        let engine = engine(&audit, &ids, &BTreeSet::new(), batch_size, MirrorMode::None);
        let report = engine.run().unwrap();

        let sizes: Vec<usize> = engine.destination().write_calls().iter().map(|c| c.len).collect();
        let n = ids.len();
        prop_assert_eq!(sizes.len(), n.div_ceil(batch_size));
        for size in sizes.iter().take(n / batch_size) {
            prop_assert_eq!(*size, batch_size);
        }
        if n % batch_size != 0 {
            prop_assert_eq!(sizes.last().copied(), Some(n % batch_size));
        }
        prop_assert_eq!(report.copy.documents_written, n as u64);
    }

    #[test]
    fn copy_is_complete((source, destination) in overlapping_ids_strategy()) {
        let audit = AuditDir::new();
        let engine = engine(&audit, &source, &destination, 7, MirrorMode::None);
        engine.run().unwrap();

        for document in engine.source().documents() {
            let id = mongotransfer_store::Identifier::of(&document).unwrap();
            prop_assert_eq!(engine.destination().get(&id), Some(document));
        }
        let expected: BTreeSet<i64> = widen(&source).union(&widen(&destination)).copied().collect();
        prop_assert_eq!(int_ids(engine.destination()), expected);
    }

    #[test]
    fn test_mode_reports_difference(
        (source, destination) in overlapping_ids_strategy(),
        batch_size in batch_size_strategy(),
    ) {
        let audit = AuditDir::new();
        let engine = engine(&audit, &source, &destination, batch_size, MirrorMode::Test);
        let report = engine.run().unwrap();

        let residual: BTreeSet<i64> = widen(&destination).difference(&widen(&source)).copied().collect();
        match &report.reconcile {
            ReconcileOutcome::Reported { audit_file, residual: count } => {
                prop_assert_eq!(*count, residual.len());
                prop_assert_eq!(read_int_audit(audit_file), residual);
            }
            ReconcileOutcome::AlreadyMirrored => {
                prop_assert!(residual.is_empty());
            }
            other => {
                prop_assert!(false, "unexpected outcome {:?}", other);
            }
        }
        prop_assert!(engine
            .destination()
            .write_calls()
            .iter()
            .all(|call| call.kind == WriteKind::Upsert));
    }

    #[test]
    fn delete_mode_mirrors_source(
        (source, destination) in overlapping_ids_strategy(),
        batch_size in batch_size_strategy(),
    ) {
        let audit = AuditDir::new();
        let engine = engine(&audit, &source, &destination, batch_size, MirrorMode::Delete);
        engine.run().unwrap();

        prop_assert_eq!(int_ids(engine.destination()), widen(&source));
        let deletes = engine
            .destination()
            .write_calls()
            .iter()
            .filter(|call| call.kind == WriteKind::Delete)
            .count();
        prop_assert!(deletes <= 1);
    }

    #[test]
    fn audit_lists_every_identifier(
        ids in prop::collection::vec(identifier_strategy(), 0..32),
    ) {
        let audit = AuditDir::new();
        let set: IdentifierSet = ids.into_iter().collect();

        let path = AuditWriter::new(audit.path()).write(&set, SNAPSHOT_SUFFIX).unwrap();
        let listed: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        prop_assert_eq!(listed.len(), set.len());
        let expected: Vec<serde_json::Value> = set
            .sorted()
            .into_iter()
            .map(|id| serde_json::to_value(id).unwrap())
            .collect();
        prop_assert_eq!(listed, expected);
    }
}
