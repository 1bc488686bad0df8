//! Property-based tests for cache key construction.
//!
//! These tests verify the behavioral contracts of the key builder:
//! - Determinism: the same sequence of values always produces the same key
//! - Boundary sensitivity: splitting a value differently changes the key
//! - Order sensitivity: reordering values changes the key

use proptest::prelude::*;
use restash_cache_key::{CacheKey, CacheKeyBuilder, NoopObserver};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// A typed value to feed a builder
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Byte(u8),
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Bytes(Vec<u8>),
    Str(String),
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<u8>().prop_map(Value::Byte),
        any::<i32>().prop_map(Value::Int),
        any::<i64>().prop_map(Value::Long),
        any::<f64>().prop_map(Value::Double),
        any::<bool>().prop_map(Value::Boolean),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        ".{0,12}".prop_map(Value::Str),
    ]
}

fn key_of(values: &[Value]) -> CacheKey {
    let mut builder = CacheKeyBuilder::new().with_observer(NoopObserver);
    for value in values {
        match value {
            Value::Byte(b) => builder.put_byte(*b),
            Value::Int(i) => builder.put_int(*i),
            Value::Long(l) => builder.put_long(*l),
            Value::Double(d) => builder.put_double(*d),
            Value::Boolean(b) => builder.put_boolean(*b),
            Value::Bytes(bytes) => builder.put_bytes(bytes),
            Value::Str(s) => builder.put_string(s),
        };
    }
    builder.build()
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    /// Contract: the same sequence of values always produces the same key
    #[test]
    fn key_is_deterministic(values in prop::collection::vec(value_strategy(), 0..8)) {
        prop_assert_eq!(key_of(&values), key_of(&values));
    }

    /// Contract: moving a split point between two adjacent strings changes the key
    #[test]
    fn string_split_point_changes_key(
        s in "[a-z]{2,16}",
        split_a in 0usize..16,
        split_b in 0usize..16,
    ) {
        let a = split_a % (s.len() + 1);
        let b = split_b % (s.len() + 1);
        prop_assume!(a != b);

        let first = key_of(&[Value::Str(s[..a].to_string()), Value::Str(s[a..].to_string())]);
        let second = key_of(&[Value::Str(s[..b].to_string()), Value::Str(s[b..].to_string())]);
        prop_assert_ne!(first, second);
    }

    /// Contract: moving a split point between two adjacent byte slices changes the key
    #[test]
    fn bytes_split_point_changes_key(
        bytes in prop::collection::vec(any::<u8>(), 2..32),
        split_a in 0usize..32,
        split_b in 0usize..32,
    ) {
        let a = split_a % (bytes.len() + 1);
        let b = split_b % (bytes.len() + 1);
        prop_assume!(a != b);

        let first = key_of(&[
            Value::Bytes(bytes[..a].to_vec()),
            Value::Bytes(bytes[a..].to_vec()),
        ]);
        let second = key_of(&[
            Value::Bytes(bytes[..b].to_vec()),
            Value::Bytes(bytes[b..].to_vec()),
        ]);
        prop_assert_ne!(first, second);
    }

    /// Contract: changing a single string value changes the key
    #[test]
    fn different_string_produces_different_key(a in ".{0,12}", b in ".{0,12}") {
        prop_assume!(a != b);
        prop_assert_ne!(key_of(&[Value::Str(a)]), key_of(&[Value::Str(b)]));
    }

    /// Contract: swapping two distinct values changes the key
    #[test]
    fn swapping_values_changes_key(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        let forward = key_of(&[Value::Long(a), Value::Long(b)]);
        let reversed = key_of(&[Value::Long(b), Value::Long(a)]);
        prop_assert_ne!(forward, reversed);
    }

    /// Contract: keys render as 64 lowercase hex characters and parse back
    #[test]
    fn key_hex_is_canonical(values in prop::collection::vec(value_strategy(), 0..4)) {
        let key = key_of(&values);
        let hex = key.to_hex();
        prop_assert_eq!(hex.len(), 64);
        prop_assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        let parsed: CacheKey = hex.parse().unwrap();
        prop_assert_eq!(parsed, key);
    }
}
