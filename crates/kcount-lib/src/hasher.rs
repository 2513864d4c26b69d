//! Deterministic hash state for k-mer keyed maps using ahash.
//!
//! Count tables and sparse solid sets are hashed with a seeded
//! [`RandomState`], so two tables filled in the same order iterate (and
//! therefore serialize) in the same order across processes.

use crate::constants::DEFAULT_SEED;
use ahash::RandomState;
use std::collections::{HashMap, HashSet};

/// Hash map from k-mer key with the deterministic hash state
pub type KeyMap<V> = HashMap<u64, V, RandomState>;

/// Hash set of k-mer keys with the deterministic hash state
pub type KeySet = HashSet<u64, RandomState>;

/// Build the seeded hash state
#[inline]
pub fn seeded_state(seed: u64) -> RandomState {
    RandomState::with_seeds(seed, !seed, seed, !seed)
}

/// Empty [`KeyMap`] with the default seed
pub fn new_key_map<V>() -> KeyMap<V> {
    HashMap::with_hasher(seeded_state(DEFAULT_SEED))
}

/// Empty [`KeySet`] with the default seed
pub fn new_key_set() -> KeySet {
    HashSet::with_hasher(seeded_state(DEFAULT_SEED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasher;

    #[test]
    fn test_deterministic_hashing() {
        let value = 0x123456789abcdef0u64;

        // Same seed should produce same hash
        assert_eq!(
            seeded_state(42).hash_one(value),
            seeded_state(42).hash_one(value)
        );

        // Different seed should produce different hash
        assert_ne!(
            seeded_state(42).hash_one(value),
            seeded_state(43).hash_one(value)
        );
    }

    #[test]
    fn test_same_insertions_same_iteration_order() {
        let mut a: KeyMap<u16> = new_key_map();
        let mut b: KeyMap<u16> = new_key_map();
        for key in (0..500u64).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 4) {
            a.insert(key, 1);
            b.insert(key, 1);
        }

        let order_a: Vec<u64> = a.keys().copied().collect();
        let order_b: Vec<u64> = b.keys().copied().collect();
        assert_eq!(order_a, order_b);
    }
}
