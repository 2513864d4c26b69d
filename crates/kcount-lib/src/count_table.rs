//! Saturating k-mer count table
//!
//! A [`CountTable`] maps k-mer keys to a 16-bit count that clamps at
//! [`Count::MAX`] instead of wrapping. Only keys seen at least once are
//! stored.

use crate::config::RecordFormat;
use crate::constants::MAX_K;
use crate::error::{check_k, Error, IoError, Result};
use crate::hasher::{new_key_map, KeyMap};
use crate::kmer::{canonical, mask, Key};
use crate::serialization::{self, expect_end, read_key, write_key, Header, StructureKind};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::info;

/// Occurrence counter of a k-mer
pub type Count = u16;

/// Mapping from k-mer key to saturating count
#[derive(Clone, Debug)]
pub struct CountTable {
    k: u8,
    counts: KeyMap<Count>,
}

impl CountTable {
    /// Create an empty table for k-mers of size `k`
    ///
    /// # Errors
    /// Returns [`Error::InvalidK`] unless 1 <= k <= 31.
    pub fn new(k: u8) -> Result<Self> {
        Ok(Self {
            k: check_k(k)?,
            counts: new_key_map(),
        })
    }

    /// K-mer size
    #[inline]
    pub fn k(&self) -> u8 {
        self.k
    }

    /// Number of distinct keys with a non-zero count
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True if nothing has been counted
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Increase the count of `key` by one
    #[inline]
    pub fn inc(&mut self, key: Key) {
        self.increment(key, false);
    }

    /// Increase the count of the canonical form of `key` by one
    #[inline]
    pub fn inc_canonic(&mut self, key: Key) {
        self.increment(key, true);
    }

    /// Count of `key`, 0 if never seen
    #[inline]
    pub fn get(&self, key: Key) -> Count {
        self.lookup(key, false)
    }

    /// Count of the canonical form of `key`, 0 if never seen
    #[inline]
    pub fn get_canonic(&self, key: Key) -> Count {
        self.lookup(key, true)
    }

    fn increment(&mut self, key: Key, canonic: bool) {
        let key = self.resolve(key, canonic);
        let count = self.counts.entry(key).or_insert(0);
        *count = count.saturating_add(1);
    }

    fn lookup(&self, key: Key, canonic: bool) -> Count {
        let key = self.resolve(key, canonic);
        self.counts.get(&key).copied().unwrap_or(0)
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

    /// Iterate over `(key, count)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (Key, Count)> + '_ {
        self.counts.iter().map(|(&key, &count)| (key, count))
    }

    /// Add the counts of `other` into this table (saturating)
    ///
    /// # Errors
    /// Returns [`Error::KMismatch`] if the two tables use different k.
    pub fn merge(&mut self, other: &CountTable) -> Result<()> {
        if other.k != self.k {
            return Err(Error::KMismatch {
                expected: self.k,
                actual: other.k,
            });
        }
        self.absorb(other.iter());
        Ok(())
    }

    pub(crate) fn absorb<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (Key, Count)>,
    {
        for (key, count) in entries {
            let slot = self.counts.entry(key).or_insert(0);
            *slot = slot.saturating_add(count);
        }
    }

    /// Count every k-mer of a FASTA file, in canonical form
    ///
    /// Windows holding a byte other than A/C/G/T are skipped. On error the
    /// table is left unchanged.
    ///
    /// # Errors
    /// [`IoError::CantOpenFile`] if `path` can't be opened,
    /// [`IoError::ReadError`] on a malformed stream or a FASTQ record.
    pub fn count_fasta<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IoError> {
        crate::ingest::count_file(self, path.as_ref(), RecordFormat::Fasta)
    }

    /// Count every k-mer of a FASTQ file, in canonical form
    ///
    /// See [`count_fasta`](Self::count_fasta).
    pub fn count_fastq<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IoError> {
        crate::ingest::count_file(self, path.as_ref(), RecordFormat::Fastq)
    }

    /// Serialize the table to `path`
    pub fn serialize<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        self.serialize_with_abundance(path, 0)
    }

    /// Serialize only the entries with a count of at least `min_abundance`
    pub fn serialize_with_abundance<P: AsRef<Path>>(
        &self,
        path: P,
        min_abundance: Count,
    ) -> Result<(), IoError> {
        let path = path.as_ref();
        serialization::write_atomically(path, |w| self.write_to(w, min_abundance))?;
        info!(
            "Saved counts of {} k-mers (k={}) to {}",
            self.iter().filter(|&(_, c)| c >= min_abundance).count(),
            self.k,
            path.display()
        );
        Ok(())
    }

    /// Deserialize a table from `path`
    ///
    /// # Errors
    /// [`IoError::CantOpenFile`] if `path` can't be opened,
    /// [`IoError::ReadError`] if the content is not a valid count table.
    pub fn deserialize<P: AsRef<Path>>(path: P) -> Result<Self, IoError> {
        let path = path.as_ref();
        let table = serialization::read_file(path, Self::read_from)?;
        info!(
            "Loaded counts of {} k-mers (k={}) from {}",
            table.len(),
            table.k,
            path.display()
        );
        Ok(table)
    }

    /// Write header and payload to `writer`, keeping entries with a count of
    /// at least `min_abundance`
    pub fn write_to(&self, writer: &mut dyn Write, min_abundance: Count) -> io::Result<()> {
        let kept = || self.iter().filter(move |&(_, count)| count >= min_abundance);

        Header::new(self.k, StructureKind::Counter, kept().count() as u64).write(writer)?;
        for (key, count) in kept() {
            write_key(writer, key, self.k)?;
            writer.write_all(&count.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read a table written by [`write_to`](Self::write_to); the reader must
    /// hold nothing after the payload
    pub fn read_from(reader: &mut dyn Read) -> io::Result<Self> {
        let header = Header::read_expecting(reader, StructureKind::Counter)?;
        debug_assert!(header.k <= MAX_K);

        let mut counts: KeyMap<Count> = new_key_map();
        counts.reserve(header.capacity_hint());

        let mut count_bytes = [0u8; std::mem::size_of::<Count>()];
        for _ in 0..header.entry_count {
            let key = read_key(reader, header.k)?;
            reader.read_exact(&mut count_bytes)?;
            let count = Count::from_le_bytes(count_bytes);

            if count == 0 {
                return Err(serialization::invalid_data(format!(
                    "Zero count stored for key {:#x}",
                    key
                )));
            }
            if counts.insert(key, count).is_some() {
                return Err(serialization::invalid_data(format!(
                    "Key {:#x} stored twice",
                    key
                )));
            }
        }
        expect_end(reader)?;

        Ok(Self {
            k: header.k,
            counts,
        })
    }
}
