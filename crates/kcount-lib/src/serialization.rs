//! Binary serialization shared by [`CountTable`](crate::CountTable) and
//! [`SolidSet`](crate::SolidSet)
//!
//! # File Format
//!
//! All integers are little-endian.
//!
//! ```text
//! Header (16 bytes)
//!   ├─ magic: "KCNT"
//!   ├─ version: u8
//!   ├─ k: u8                (1..=31)
//!   ├─ kind: u8             (0 = counter, 1 = solid)
//!   ├─ count_bytes: u8      (2 for counter, 0 for solid)
//!   └─ entry_count: u64
//! Payload
//!   ├─ counter: entry_count × (key: ceil(2k/8) bytes, count: u16)
//!   └─ solid:   entry_count × (key: ceil(2k/8) bytes), strictly ascending
//! ```
//!
//! Files are written to a temporary file next to the destination and renamed
//! over it once complete, so a failed write never leaves a partial file.
//! On unix they are created with mode 0644 (minus the umask).

use crate::constants::{is_valid_k, key_bytes};
use crate::error::IoError;
use crate::kmer::{mask, Key};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Magic bytes for the kcount format
const MAGIC: &[u8; 4] = b"KCNT";

/// File format version
const FORMAT_VERSION: u8 = 1;

/// Mode of written files on unix, before the umask
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// Upper bound on entries preallocated from an untrusted header
const MAX_PREALLOCATED_ENTRIES: u64 = 1 << 20;

/// Which structure a file holds
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructureKind {
    /// A [`CountTable`](crate::CountTable)
    Counter = 0,
    /// A [`SolidSet`](crate::SolidSet)
    Solid = 1,
}

impl StructureKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Counter),
            1 => Some(Self::Solid),
            _ => None,
        }
    }

    /// Width in bytes of the count stored after every key
    pub const fn count_bytes(self) -> u8 {
        match self {
            Self::Counter => std::mem::size_of::<crate::Count>() as u8,
            Self::Solid => 0,
        }
    }
}

/// Header of a serialized structure
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// K-mer size
    pub k: u8,
    /// Structure stored in the payload
    pub kind: StructureKind,
    /// Number of payload records
    pub entry_count: u64,
}

impl Header {
    /// Serialized size in bytes
    pub const SIZE: usize = 16;

    /// Create a new header
    pub fn new(k: u8, kind: StructureKind, entry_count: u64) -> Self {
        Self { k, kind, entry_count }
    }

    /// Write header to a writer
    pub fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&[FORMAT_VERSION, self.k, self.kind as u8, self.kind.count_bytes()])?;
        writer.write_all(&self.entry_count.to_le_bytes())?;
        Ok(())
    }

    /// Read header from a reader
    pub fn read(reader: &mut dyn Read) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(invalid_data("Invalid magic number for kcount file"));
        }

        let mut fields = [0u8; 4];
        reader.read_exact(&mut fields)?;
        let [version, k, kind, count_bytes] = fields;

        if version != FORMAT_VERSION {
            return Err(invalid_data(format!(
                "Incompatible format version: {}, expected {}",
                version, FORMAT_VERSION
            )));
        }
        if !is_valid_k(k) {
            return Err(invalid_data(format!("k={} out of range [1, 31]", k)));
        }
        let kind = StructureKind::from_u8(kind)
            .ok_or_else(|| invalid_data(format!("Unknown structure kind {}", kind)))?;
        if count_bytes != kind.count_bytes() {
            return Err(invalid_data(format!(
                "Count width {} does not match {:?}",
                count_bytes, kind
            )));
        }

        let mut entry_count = [0u8; 8];
        reader.read_exact(&mut entry_count)?;

        Ok(Self {
            k,
            kind,
            entry_count: u64::from_le_bytes(entry_count),
        })
    }

    /// Read a header and check it holds the expected structure
    pub fn read_expecting(reader: &mut dyn Read, kind: StructureKind) -> io::Result<Self> {
        let header = Self::read(reader)?;
        if header.kind != kind {
            return Err(invalid_data(format!(
                "Expected a {:?} file, found {:?}",
                kind, header.kind
            )));
        }
        Ok(header)
    }

    /// Capacity to reserve for the payload records
    pub(crate) fn capacity_hint(&self) -> usize {
        self.entry_count.min(MAX_PREALLOCATED_ENTRIES) as usize
    }
}

/// Write a key on `ceil(2k/8)` bytes
#[inline]
pub fn write_key(writer: &mut dyn Write, key: Key, k: u8) -> io::Result<()> {
    writer.write_all(&key.to_le_bytes()[..key_bytes(k)])
}

/// Read a key written by [`write_key`], rejecting bits above `2k`
#[inline]
pub fn read_key(reader: &mut dyn Read, k: u8) -> io::Result<Key> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes[..key_bytes(k)])?;
    let key = u64::from_le_bytes(bytes);
    if key & !mask(k) != 0 {
        return Err(invalid_data(format!("Key {:#x} has bits above 2k for k={}", key, k)));
    }
    Ok(key)
}

/// Check the reader is exhausted
pub fn expect_end(reader: &mut dyn Read) -> io::Result<()> {
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => return Ok(()),
            Ok(_) => return Err(invalid_data("Trailing bytes after payload")),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

pub(crate) fn invalid_data<E>(msg: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Write a file through `body`, replacing `path` only if everything succeeded
pub(crate) fn write_atomically<F>(path: &Path, body: F) -> Result<(), IoError>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(OUTPUT_MODE));
    }
    let tmp = builder.tempfile_in(dir).map_err(|e| {
        warn!("Can't create {}: {}", path.display(), e);
        IoError::CantCreateFile
    })?;

    let mut writer = BufWriter::new(tmp);
    body(&mut writer).map_err(|e| {
        warn!("Error while writing {}: {}", path.display(), e);
        IoError::WriteError
    })?;

    let tmp = writer.into_inner().map_err(|e| {
        warn!("Error while flushing {}: {}", path.display(), e.error());
        IoError::WriteError
    })?;

    tmp.persist(path).map_err(|e| {
        warn!("Can't move output into {}: {}", path.display(), e.error);
        if path.is_dir() || e.error.kind() == io::ErrorKind::PermissionDenied {
            IoError::CantCreateFile
        } else {
            IoError::WriteError
        }
    })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Read a file through `body`; the file is closed when this returns
pub(crate) fn read_file<T, F>(path: &Path, body: F) -> Result<T, IoError>
where
    F: FnOnce(&mut dyn Read) -> io::Result<T>,
{
    let file = File::open(path).map_err(|e| {
        warn!("Can't open {}: {}", path.display(), e);
        IoError::CantOpenFile
    })?;

    let mut reader = BufReader::new(file);
    body(&mut reader).map_err(|e| {
        warn!("Error while reading {}: {}", path.display(), e);
        IoError::ReadError
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let header = Header::new(31, StructureKind::Counter, 42);

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), Header::SIZE);

        let header2 = Header::read(&mut buffer.as_slice()).unwrap();
        assert_eq!(header, header2);
    }

    #[test]
    fn test_header_layout() {
        let mut buffer = Vec::new();
        Header::new(5, StructureKind::Solid, 3).write(&mut buffer).unwrap();
        assert_eq!(
            buffer,
            [b'K', b'C', b'N', b'T', 1, 5, 1, 0, 3, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_header_rejects_bad_fields() {
        let mut good = Vec::new();
        Header::new(5, StructureKind::Counter, 1).write(&mut good).unwrap();

        let corrupt = |offset: usize, value: u8| {
            let mut bytes = good.clone();
            bytes[offset] = value;
            Header::read(&mut bytes.as_slice()).unwrap_err().kind()
        };

        assert_eq!(corrupt(0, b'X'), io::ErrorKind::InvalidData); // magic
        assert_eq!(corrupt(4, 9), io::ErrorKind::InvalidData); // version
        assert_eq!(corrupt(5, 0), io::ErrorKind::InvalidData); // k = 0
        assert_eq!(corrupt(5, 32), io::ErrorKind::InvalidData); // k = 32
        assert_eq!(corrupt(6, 7), io::ErrorKind::InvalidData); // kind
        assert_eq!(corrupt(7, 4), io::ErrorKind::InvalidData); // count width

        let truncated = &good[..10];
        assert_eq!(
            Header::read(&mut &truncated[..]).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn test_read_expecting() {
        let mut buffer = Vec::new();
        Header::new(5, StructureKind::Solid, 0).write(&mut buffer).unwrap();

        assert!(Header::read_expecting(&mut buffer.as_slice(), StructureKind::Solid).is_ok());
        assert!(Header::read_expecting(&mut buffer.as_slice(), StructureKind::Counter).is_err());
    }

    #[test]
    fn test_key_width() {
        let mut buffer = Vec::new();
        write_key(&mut buffer, 108, 5).unwrap();
        assert_eq!(buffer, [108, 0]);

        write_key(&mut buffer, 1 << 61, 31).unwrap();
        assert_eq!(buffer.len(), 2 + 8);

        let mut reader = buffer.as_slice();
        assert_eq!(read_key(&mut reader, 5).unwrap(), 108);
        assert_eq!(read_key(&mut reader, 31).unwrap(), 1 << 61);
    }

    #[test]
    fn test_read_key_rejects_high_bits() {
        // 0x0400 needs 11 bits, k = 5 allows 10
        let bytes = [0x00u8, 0x04];
        assert!(read_key(&mut &bytes[..], 5).is_err());
    }

    #[test]
    fn test_expect_end() {
        assert!(expect_end(&mut &b""[..]).is_ok());
        assert!(expect_end(&mut &b"x"[..]).is_err());
    }

    #[test]
    fn test_write_atomically_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.kcnt");

        let result = write_atomically(&path, |w| w.write_all(b"data"));
        assert_eq!(result, Err(IoError::CantCreateFile));
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.kcnt");
        std::fs::write(&path, b"previous").unwrap();

        let result = write_atomically(&path, |w| {
            w.write_all(b"partial")?;
            Err(io::Error::other("disk full"))
        });
        assert_eq!(result, Err(IoError::WriteError));
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");

        // No temporary file is left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_atomically_onto_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("taken");
        std::fs::create_dir(&target).unwrap();

        let result = write_atomically(&target, |w| w.write_all(b"data"));
        assert_eq!(result, Err(IoError::CantCreateFile));
        assert!(target.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_atomically(&path, |w| w.write_all(b"ACTGA,3\n")).unwrap();

        // Same mode as a plain File::create, capped to 0644
        let reference = dir.path().join("reference");
        File::create(&reference).unwrap();
        let mode_of = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;

        assert_eq!(mode_of(&path), mode_of(&reference) & OUTPUT_MODE);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_file(&dir.path().join("nope.kcnt"), |_| Ok(()));
        assert_eq!(result, Err(IoError::CantOpenFile));
    }
}
