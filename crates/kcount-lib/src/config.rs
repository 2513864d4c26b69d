//! Counting configuration

use crate::count_table::{Count, CountTable};
use crate::error::{check_k, Result};
use std::fmt;
use std::path::Path;

/// Record format of the input files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordFormat {
    /// FASTA, no qualities
    #[default]
    Fasta,
    /// FASTQ, with qualities
    Fastq,
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fasta => write!(f, "FASTA"),
            Self::Fastq => write!(f, "FASTQ"),
        }
    }
}

/// Parameters of a counting run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountConfiguration {
    /// K-mer length, in [1, 31]
    pub k: u8,

    /// Minimal count for a k-mer to be reported or marked solid
    pub abundance: Count,

    /// Format of every input file
    pub record_format: RecordFormat,
}

impl Default for CountConfiguration {
    fn default() -> Self {
        Self {
            k: 31,
            abundance: 2,
            record_format: RecordFormat::Fasta,
        }
    }
}

impl CountConfiguration {
    /// Create a configuration for k-mer length `k`, other parameters default
    pub fn new(k: u8) -> Result<Self> {
        let config = Self {
            k,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        check_k(self.k)?;
        Ok(())
    }

    /// Count every input into a fresh table
    ///
    /// Stops at the first input that fails.
    pub fn count<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<CountTable> {
        let mut table = CountTable::new(self.k)?;
        for input in inputs {
            match self.record_format {
                RecordFormat::Fasta => table.count_fasta(input)?,
                RecordFormat::Fastq => table.count_fastq(input)?,
            }
        }
        Ok(table)
    }

    /// Log configuration parameters via tracing
    pub fn print(&self) {
        tracing::info!("Count Configuration:");
        tracing::info!("  k = {}", self.k);
        tracing::info!("  abundance = {}", self.abundance);
        tracing::info!("  record_format = {}", self.record_format);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, IoError};
    use crate::kmer::encode;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CountConfiguration::default();
        assert_eq!(config.k, 31);
        assert_eq!(config.abundance, 2);
        assert_eq!(config.record_format, RecordFormat::Fasta);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_config() {
        let config = CountConfiguration::new(21).unwrap();
        assert_eq!(config.k, 21);
        assert_eq!(config.abundance, 2);
    }

    #[test]
    fn test_validate_k_out_of_range() {
        assert_eq!(CountConfiguration::new(0), Err(Error::InvalidK(0)));

        let config = CountConfiguration { k: 32, ..CountConfiguration::default() };
        assert_eq!(config.validate(), Err(Error::InvalidK(32)));
    }

    #[test]
    fn test_record_format_display() {
        assert_eq!(RecordFormat::Fasta.to_string(), "FASTA");
        assert_eq!(RecordFormat::Fastq.to_string(), "FASTQ");
    }

    #[test]
    fn test_count_inputs() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, ">a\nACTGA").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, ">b\nTCAGT").unwrap();

        let config = CountConfiguration::new(5).unwrap();
        let table = config.count(&[first.path(), second.path()]).unwrap();
        assert_eq!(table.get_canonic(encode(b"ACTGA").unwrap()), 2);

        let fastq = CountConfiguration {
            record_format: RecordFormat::Fastq,
            ..config
        };
        assert_eq!(
            fastq.count(&[first.path()]).unwrap_err(),
            Error::Io(IoError::ReadError)
        );
    }
}
