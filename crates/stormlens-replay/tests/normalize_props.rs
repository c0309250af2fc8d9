#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Property tests for the buffer normalizer.

use proptest::prelude::*;
use stormlens_replay::{DecodedValue, normalize};

fn arb_value() -> impl Strategy<Value = DecodedValue> {
    let leaf = prop_oneof![
        Just(DecodedValue::Null),
        any::<bool>().prop_map(DecodedValue::Bool),
        any::<i64>().prop_map(DecodedValue::Int),
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(DecodedValue::Bytes),
        "[a-zA-Z0-9 ]{0,16}".prop_map(DecodedValue::Text),
        (0u64..64, proptest::collection::vec(any::<u8>(), 0..8))
            .prop_map(|(bits, data)| DecodedValue::BitArray { bits, data }),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(DecodedValue::Array),
            proptest::collection::btree_map("m_[a-z]{1,10}", inner, 0..6)
                .prop_map(DecodedValue::Struct),
        ]
    })
}

fn contains_bytes(value: &DecodedValue) -> bool {
    match value {
        DecodedValue::Bytes(_) => true,
        DecodedValue::Array(items) => items.iter().any(contains_bytes),
        DecodedValue::Struct(fields) => fields.values().any(contains_bytes),
        _ => false,
    }
}

proptest! {
    #[test]
    fn normalize_is_idempotent(value in arb_value()) {
        let once = normalize(value);
        let twice = normalize(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalize_leaves_no_buffers_behind(value in arb_value()) {
        prop_assert!(!contains_bytes(&normalize(value)));
    }

    #[test]
    fn normalize_preserves_container_shape(value in arb_value()) {
        let normalized = normalize(value.clone());
        match (&value, &normalized) {
            (DecodedValue::Array(before), DecodedValue::Array(after)) => {
                prop_assert_eq!(before.len(), after.len());
            }
            (DecodedValue::Struct(before), DecodedValue::Struct(after)) => {
                let before_keys: Vec<_> = before.keys().collect();
                let after_keys: Vec<_> = after.keys().collect();
                prop_assert_eq!(before_keys, after_keys);
            }
            (DecodedValue::Bytes(_), DecodedValue::Text(_)) => {}
            (before, after) => prop_assert_eq!(before, after),
        }
    }
}
