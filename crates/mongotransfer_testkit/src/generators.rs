//! Property-based test generators using proptest.
//!
//! Identifier values are drawn from a small range so that source and
//! destination sets overlap often.

use mongotransfer_store::oid::ObjectId;
use mongotransfer_store::{Bson, Identifier};
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Upper bound (exclusive) of generated integer identifiers.
pub const ID_RANGE: i32 = 64;

/// Strategy for identifiers of mixed BSON types.
pub fn identifier_strategy() -> impl Strategy<Value = Identifier> {
    prop_oneof![
        (0..ID_RANGE).prop_map(Identifier::new),
        (0..i64::from(ID_RANGE)).prop_map(Identifier::new),
        "[a-z]{1,6}".prop_map(Identifier::new),
        prop::array::uniform12(any::<u8>())
            .prop_map(|bytes| Identifier::new(Bson::ObjectId(ObjectId::from_bytes(bytes)))),
    ]
}

/// Strategy for a set of integer identifiers.
pub fn id_values_strategy(max_len: usize) -> impl Strategy<Value = BTreeSet<i32>> {
    prop::collection::btree_set(0..ID_RANGE, 0..=max_len)
}

/// Strategy for (source ids, destination ids), overlapping by construction.
pub fn overlapping_ids_strategy() -> impl Strategy<Value = (BTreeSet<i32>, BTreeSet<i32>)> {
    (id_values_strategy(48), id_values_strategy(48))
}

/// Strategy for batch sizes, small enough to produce several batches.
pub fn batch_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=16
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn identifiers_equal_their_clones(id in identifier_strategy()) {
            prop_assert_eq!(id.clone(), id);
        }

        #[test]
        fn id_values_stay_in_range(ids in id_values_strategy(48)) {
            prop_assert!(ids.len() <= 48);
            prop_assert!(ids.iter().all(|id| (0..ID_RANGE).contains(id)));
        }

        #[test]
        fn batch_size_is_positive(size in batch_size_strategy()) {
            prop_assert!(size >= 1);
        }
    }
}
