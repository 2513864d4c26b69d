//! Error types
//!
//! [`IoError`] is the whole failure vocabulary of operations touching the
//! filesystem (ingestion, serialization, dumps). [`Error`] covers in-memory
//! construction failures and wraps the other kinds.

use crate::encoding::EncodingError;
use thiserror::Error;

/// Failure of an operation reading or writing a file
#[repr(C)]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoError {
    /// The output file can't be created
    #[error("Can't create file")]
    CantCreateFile,

    /// The input file can't be opened
    #[error("Can't open file")]
    CantOpenFile,

    /// Writing to the output failed
    #[error("Error during write")]
    WriteError,

    /// The input is truncated, malformed or not of the expected kind
    #[error("Error during read")]
    ReadError,
}

/// Main error type of kcount
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// k outside [1, 31]
    #[error("k must be in range [1, 31], got k={0}")]
    InvalidK(u8),

    /// Two structures with different k were combined
    #[error("k mismatch: expected k={expected}, got k={actual}")]
    KMismatch {
        /// k of the receiving structure
        expected: u8,
        /// k of the other structure
        actual: u8,
    },

    /// See [`EncodingError`]
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// See [`IoError`]
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Result type for kcount operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Validate a k-mer size
pub(crate) fn check_k(k: u8) -> Result<u8> {
    if crate::constants::is_valid_k(k) {
        Ok(k)
    } else {
        Err(Error::InvalidK(k))
    }
}
