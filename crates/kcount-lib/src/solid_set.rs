//! Presence set of solid k-mers
//!
//! A [`SolidSet`] answers "is this k-mer solid" for every key of the k-mer
//! space. For small k the answer lives in a dense bitvector indexed by key,
//! above [`DENSE_SOLID_MAX_K`] in a hash set of the solid keys. On disk both
//! are stored as the ascending list of solid keys.

use crate::constants::{kmer_space_size, DENSE_SOLID_MAX_K};
use crate::count_table::{Count, CountTable};
use crate::error::{check_k, IoError, Result};
use crate::hasher::{new_key_set, KeySet};
use crate::kmer::{canonical, mask, Key};
use crate::serialization::{self, expect_end, read_key, write_key, Header, StructureKind};
use bitvec::prelude::*;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug)]
enum Storage {
    Dense(BitVec<u64, Lsb0>),
    Sparse(KeySet),
}

impl Storage {
    fn for_k(k: u8) -> Self {
        if k <= DENSE_SOLID_MAX_K {
            Self::Dense(bitvec![u64, Lsb0; 0; kmer_space_size(k) as usize])
        } else {
            Self::Sparse(new_key_set())
        }
    }
}

/// Set of solid k-mers, every key absent by default
#[derive(Clone, Debug)]
pub struct SolidSet {
    k: u8,
    storage: Storage,
}

impl SolidSet {
    /// Create a set for k-mers of size `k` where nothing is solid
    ///
    /// # Errors
    /// Returns [`Error::InvalidK`](crate::Error::InvalidK) unless 1 <= k <= 31.
    pub fn new(k: u8) -> Result<Self> {
        let k = check_k(k)?;
        Ok(Self {
            k,
            storage: Storage::for_k(k),
        })
    }

    /// Mark as solid every key of `counter` with a count of at least
    /// `abundance`
    pub fn from_counter(counter: &CountTable, abundance: Count) -> Self {
        let mut solid = Self {
            k: counter.k(),
            storage: Storage::for_k(counter.k()),
        };
        for (key, _) in counter.iter().filter(|&(_, count)| count >= abundance) {
            solid.set(key, true);
        }
        info!(
            "{} of {} k-mers are solid at abundance {}",
            solid.len(),
            counter.len(),
            abundance
        );
        solid
    }

    /// K-mer size
    #[inline]
    pub fn k(&self) -> u8 {
        self.k
    }

    /// Number of solid keys
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Dense(bits) => bits.count_ones(),
            Storage::Sparse(keys) => keys.len(),
        }
    }

    /// True if no key is solid
    pub fn is_empty(&self) -> bool {
        match &self.storage {
            Storage::Dense(bits) => bits.not_any(),
            Storage::Sparse(keys) => keys.is_empty(),
        }
    }

    /// Mark `key` as solid or not
    #[inline]
    pub fn set(&mut self, key: Key, value: bool) {
        self.assign(key, value, false);
    }

    /// Mark the canonical form of `key` as solid or not
    #[inline]
    pub fn set_canonic(&mut self, key: Key, value: bool) {
        self.assign(key, value, true);
    }

    /// Whether `key` is solid
    #[inline]
    pub fn get(&self, key: Key) -> bool {
        self.lookup(key, false)
    }

    /// Whether the canonical form of `key` is solid
    #[inline]
    pub fn get_canonic(&self, key: Key) -> bool {
        self.lookup(key, true)
    }

    fn assign(&mut self, key: Key, value: bool, canonic: bool) {
        let key = self.resolve(key, canonic);
        match &mut self.storage {
            Storage::Dense(bits) => bits.set(key as usize, value),
            Storage::Sparse(keys) => {
                if value {
                    keys.insert(key);
                } else {
                    keys.remove(&key);
                }
            }
        }
    }

    fn lookup(&self, key: Key, canonic: bool) -> bool {
        let key = self.resolve(key, canonic);
        match &self.storage {
            Storage::Dense(bits) => bits[key as usize],
            Storage::Sparse(keys) => keys.contains(&key),
        }
    }

    #[inline]
    fn resolve(&self, key: Key, canonic: bool) -> Key {
        debug_assert!(
            key & !mask(self.k) == 0,
            "key {:#x} has bits above 2k for k={}",
            key,
            self.k
        );
        if canonic {
            canonical(key, self.k)
        } else {
            key
        }
    }

    /// Solid keys in ascending order
    pub fn iter(&self) -> impl Iterator<Item = Key> + '_ {
        let keys: Box<dyn Iterator<Item = Key> + '_> = match &self.storage {
            Storage::Dense(bits) => Box::new(bits.iter_ones().map(|i| i as Key)),
            Storage::Sparse(keys) => {
                let mut sorted: Vec<Key> = keys.iter().copied().collect();
                sorted.sort_unstable();
                Box::new(sorted.into_iter())
            }
        };
        keys
    }

    /// Serialize the set to `path`
    pub fn serialize<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let path = path.as_ref();
        serialization::write_atomically(path, |w| self.write_to(w))?;
        info!(
            "Saved {} solid k-mers (k={}) to {}",
            self.len(),
            self.k,
            path.display()
        );
        Ok(())
    }

    /// Deserialize a set from `path`
    ///
    /// # Errors
    /// [`IoError::CantOpenFile`] if `path` can't be opened,
    /// [`IoError::ReadError`] if the content is not a valid solid set.
    pub fn deserialize<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let path = path.as_ref();
        let solid = serialization::read_file(path, Self::read_from)?;
        info!(
            "Loaded {} solid k-mers (k={}) from {}",
            solid.len(),
            solid.k,
            path.display()
        );
        Ok(solid)
    }

    /// Write header and ascending key list to `writer`
    pub fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        Header::new(self.k, StructureKind::Solid, self.len() as u64).write(writer)?;
        for key in self.iter() {
            write_key(writer, key, self.k)?;
        }
        Ok(())
    }

    /// Read a set written by [`write_to`](Self::write_to); the reader must
    /// hold nothing after the payload
    pub fn read_from(reader: &mut dyn Read) -> io::Result<Self> {
        let header = Header::read_expecting(reader, StructureKind::Solid)?;

        let mut storage = Storage::for_k(header.k);
        if let Storage::Sparse(keys) = &mut storage {
            keys.reserve(header.capacity_hint());
        }
        let mut solid = Self {
            k: header.k,
            storage,
        };

        let mut previous: Option<Key> = None;
        for _ in 0..header.entry_count {
            let key = read_key(reader, header.k)?;
            if previous.is_some_and(|p| p >= key) {
                return Err(serialization::invalid_data(format!(
                    "Solid keys not strictly ascending at {:#x}",
                    key
                )));
            }
            solid.set(key, true);
            previous = Some(key);
        }
        expect_end(reader)?;

        Ok(solid)
    }
}
