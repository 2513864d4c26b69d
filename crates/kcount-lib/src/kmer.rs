//! K-mer keys: encoding, reverse complement and canonical form
//!
//! A k-mer of size k ≤ 31 is packed into the low `2k` bits of a [`Key`],
//! first base in the most significant pair. The remaining high bits are
//! always zero. Integer order on keys is the lexicographic order of the
//! strings under A < C < T < G.

use crate::constants::MAX_K;
use crate::encoding::{complement_base, decode_base, encode_base, EncodingError, BASE_LUT, INVALID_BASE};

/// An encoded k-mer
pub type Key = u64;

/// Bit mask covering the `2k` significant bits of a key
#[inline]
pub const fn mask(k: u8) -> Key {
    (1u64 << (2 * k as u64)) - 1
}

/// Encode a k-mer window into a key, k being the window length
///
/// # Errors
/// Returns [`EncodingError::InvalidK`] if the window is empty or longer than
/// 31 bases, and [`EncodingError::InvalidBase`] on any byte outside
/// A/C/G/T (case-insensitive).
pub fn encode(window: &[u8]) -> Result<Key, EncodingError> {
    if window.is_empty() || window.len() > MAX_K as usize {
        return Err(EncodingError::InvalidK(window.len()));
    }

    let mut key: Key = 0;
    for &base in window {
        key = (key << 2) | encode_base(base)? as Key;
    }
    Ok(key)
}

/// Decode a key back to its k-mer string (uppercase)
pub fn decode(key: Key, k: u8) -> String {
    (0..k)
        .rev()
        .map(|i| decode_base((key >> (2 * i)) as u8) as char)
        .collect()
}

/// Get the reverse complement of a key
///
/// Uses bit-parallel operations: complement via XOR, then reverse 2-bit pairs.
#[inline]
pub fn reverse_complement(key: Key, k: u8) -> Key {
    debug_assert!(k >= 1 && k <= MAX_K);
    // Complement: XOR with 0xAAAA... (10 repeating) flips A<->T, C<->G
    let mut x = key ^ 0xAAAA_AAAA_AAAA_AAAAu64;
    // Swap adjacent 2-bit pairs, then nibbles, then bytes
    x = ((x >> 2) & 0x3333_3333_3333_3333u64) | ((x & 0x3333_3333_3333_3333u64) << 2);
    x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0Fu64) | ((x & 0x0F0F_0F0F_0F0F_0F0Fu64) << 4);
    x = x.swap_bytes();
    // The k real bases now sit in the top 2k bits
    x >> (64 - 2 * k as u32)
}

/// Get the canonical representation (minimum of forward and reverse complement)
#[inline]
pub fn canonical(key: Key, k: u8) -> Key {
    key.min(reverse_complement(key, k))
}

/// Incremental k-mer window over a sequence
///
/// Keeps the forward and reverse-complement keys of the last `k` bases, so
/// every new base yields the canonical key in constant time. A byte that is
/// not A/C/G/T empties the window.
#[derive(Debug, Clone)]
pub struct RollingKmer {
    k: u8,
    mask: Key,
    forward: Key,
    reverse: Key,
    len: usize,
}

impl RollingKmer {
    /// Create an empty window for k-mers of size `k`
    pub fn new(k: u8) -> Self {
        debug_assert!(k >= 1 && k <= MAX_K);
        Self {
            k,
            mask: mask(k),
            forward: 0,
            reverse: 0,
            len: 0,
        }
    }

    /// Empty the window
    #[inline]
    pub fn reset(&mut self) {
        self.forward = 0;
        self.reverse = 0;
        self.len = 0;
    }

    /// Push one sequence byte; returns the canonical key once `k` valid
    /// bases are in the window
    #[inline]
    pub fn push(&mut self, byte: u8) -> Option<Key> {
        let bits = BASE_LUT[byte as usize];
        if bits == INVALID_BASE {
            self.reset();
            return None;
        }

        self.forward = ((self.forward << 2) | bits as Key) & self.mask;
        self.reverse = (self.reverse >> 2)
            | ((complement_base(bits) as Key) << (2 * (self.k as u32 - 1)));
        self.len += 1;

        if self.len >= self.k as usize {
            Some(self.forward.min(self.reverse))
        } else {
            None
        }
    }

    /// Forward key of the current window, if full
    #[inline]
    pub fn forward(&self) -> Option<Key> {
        (self.len >= self.k as usize).then_some(self.forward)
    }
}

/// Iterate the canonical keys of every all-ACGT window of `seq`
pub fn canonical_kmers(seq: &[u8], k: u8) -> impl Iterator<Item = Key> + '_ {
    let mut window = RollingKmer::new(k);
    seq.iter().filter_map(move |&b| window.push(b))
}
