// kcount: saturating k-mer counting and solid k-mer sets
//
// Counts every k-mer (k <= 31) of FASTA/FASTQ files, derives the set of
// k-mers seen often enough, and stores both in a compact binary format.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod count_table;
pub mod dump;
pub mod encoding;
pub mod error;
pub mod hasher;
mod ingest;
pub mod kmer;
pub mod serialization;
pub mod solid_set;
pub mod spectrum;

// Re-export common types at crate root
pub use config::{CountConfiguration, RecordFormat};
pub use count_table::{Count, CountTable};
pub use encoding::EncodingError;
pub use error::{Error, IoError, Result};
pub use kmer::{canonical, decode, encode, reverse_complement, Key, RollingKmer};
pub use solid_set::SolidSet;
pub use spectrum::{Spectrum, ThresholdMethod};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
