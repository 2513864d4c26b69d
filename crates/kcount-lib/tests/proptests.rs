use kcount_lib::kmer::{canonical_kmers, mask};
use kcount_lib::{canonical, decode, encode, reverse_complement, Count, CountTable, Key, SolidSet};
use proptest::prelude::*;

fn acgt_string(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 1..=max_len)
}

fn key_and_k() -> impl Strategy<Value = (Key, u8)> {
    (1u8..=31).prop_flat_map(|k| (0..=mask(k), Just(k)))
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(kmer in acgt_string(31)) {
        let key = encode(&kmer).unwrap();
        prop_assert_eq!(decode(key, kmer.len() as u8).into_bytes(), kmer);
    }

    #[test]
    fn prop_canonical_is_strand_independent((key, k) in key_and_k()) {
        let c = canonical(key, k);
        prop_assert_eq!(canonical(c, k), c);
        prop_assert_eq!(canonical(reverse_complement(key, k), k), c);
        prop_assert_eq!(reverse_complement(reverse_complement(key, k), k), key);
        prop_assert!(c <= key);
    }

    #[test]
    fn prop_rolling_matches_window_encoding(seq in prop::collection::vec(prop::sample::select(b"ACGTN".to_vec()), 0..200), k in 1u8..=15) {
        let rolled: Vec<Key> = canonical_kmers(&seq, k).collect();
        let direct: Vec<Key> = seq
            .windows(k as usize)
            .filter_map(|w| encode(w).ok())
            .map(|key| canonical(key, k))
            .collect();
        prop_assert_eq!(rolled, direct);
    }

    #[test]
    fn prop_inc_counts_every_occurrence(key in 0u64..1024, n in 0usize..2000) {
        let mut counter = CountTable::new(5).unwrap();
        for _ in 0..n {
            counter.inc(key);
        }
        prop_assert_eq!(counter.get(key) as usize, n);
    }

    #[test]
    fn prop_table_roundtrip_and_solid_threshold(
        keys in prop::collection::vec(0u64..(1 << 14), 0..300),
        abundance in 0u16..5,
    ) {
        let mut counter = CountTable::new(7).unwrap();
        for &key in &keys {
            counter.inc(key);
        }

        let mut buffer = Vec::new();
        counter.write_to(&mut buffer, 0).unwrap();
        let loaded = CountTable::read_from(&mut buffer.as_slice()).unwrap();
        prop_assert_eq!(loaded.len(), counter.len());

        let solid = SolidSet::from_counter(&loaded, abundance);
        for key in 0..(1u64 << 14) {
            prop_assert_eq!(loaded.get(key), counter.get(key));
            prop_assert_eq!(solid.get(key), counter.get(key) > 0 && counter.get(key) >= abundance);
        }
    }

    #[test]
    fn prop_truncated_table_is_rejected(keys in prop::collection::vec(0u64..1024, 1..50), cut in 1usize..16) {
        let mut counter = CountTable::new(5).unwrap();
        for &key in &keys {
            counter.inc(key);
        }
        let mut buffer = Vec::new();
        counter.write_to(&mut buffer, 0).unwrap();

        let truncated = &buffer[..buffer.len().saturating_sub(cut)];
        prop_assert!(CountTable::read_from(&mut &truncated[..]).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_saturates_at_max(extra in 1usize..100) {
        let mut counter = CountTable::new(3).unwrap();
        for _ in 0..(Count::MAX as usize + extra) {
            counter.inc(5);
        }
        prop_assert_eq!(counter.get(5), Count::MAX);
    }
}
