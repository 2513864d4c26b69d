//! Constants and configuration for kcount
//!
//! This module defines the supported k-mer sizes, the counter width and the
//! storage thresholds used throughout the library.

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Minimum k-mer size supported
pub const MIN_K: u8 = 1;

/// Maximum k-mer size supported (2 bits per base in a u64 key)
pub const MAX_K: u8 = 31;

/// Largest k for which a [`SolidSet`](crate::SolidSet) keeps a dense bitset
/// of 4^k bits (2^28 bits, 32 MiB). Larger k use a sparse set of true keys.
pub const DENSE_SOLID_MAX_K: u8 = 14;

/// Seed for the hash state of count tables and sparse solid sets
pub const DEFAULT_SEED: u64 = 1;

/// Check if a k-mer size is valid
#[inline]
pub const fn is_valid_k(k: u8) -> bool {
    k >= MIN_K && k <= MAX_K
}

/// Number of bytes used to store a key of size `k` on disk: ceil(2k / 8)
#[inline]
pub const fn key_bytes(k: u8) -> usize {
    (2 * k as usize).div_ceil(8)
}

/// Number of distinct k-mers of size `k` (4^k)
#[inline]
pub const fn kmer_space_size(k: u8) -> u64 {
    1u64 << (2 * k as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_k() {
        assert!(is_valid_k(1));
        assert!(is_valid_k(5));
        assert!(is_valid_k(21));
        assert!(is_valid_k(31));

        // Even sizes are accepted, unlike odd-only dictionaries
        assert!(is_valid_k(2));
        assert!(is_valid_k(30));

        assert!(!is_valid_k(0));
        assert!(!is_valid_k(32));
        assert!(!is_valid_k(255));
    }

    #[test]
    fn test_key_bytes() {
        assert_eq!(key_bytes(1), 1);
        assert_eq!(key_bytes(4), 1);
        assert_eq!(key_bytes(5), 2);
        assert_eq!(key_bytes(16), 4);
        assert_eq!(key_bytes(17), 5);
        assert_eq!(key_bytes(31), 8);
    }

    #[test]
    fn test_kmer_space_size() {
        assert_eq!(kmer_space_size(1), 4);
        assert_eq!(kmer_space_size(5), 1024);
        assert_eq!(kmer_space_size(31), 1 << 62);
    }
}
