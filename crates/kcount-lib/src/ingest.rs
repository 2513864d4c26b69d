//! Sequence ingestion into a count table
//!
//! Records come from needletail, which also decompresses gzip input. Every
//! stride-1 window made only of A/C/G/T is counted in canonical form.

use crate::config::RecordFormat;
use crate::count_table::{Count, CountTable};
use crate::error::IoError;
use crate::hasher::{new_key_map, KeyMap};
use crate::kmer::canonical_kmers;
use needletail::parse_fastx_reader;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Totals of one ingested file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct IngestStats {
    /// Number of records read
    pub records: u64,
    /// Number of bases read
    pub bases: u64,
    /// Number of k-mers counted
    pub kmers: u64,
}

/// Count the k-mers of every record of `path` into `table`
///
/// Counting happens in a scratch map merged into `table` once the whole file
/// has been read, so `table` is untouched on error.
pub(crate) fn count_file(
    table: &mut CountTable,
    path: &Path,
    format: RecordFormat,
) -> Result<(), IoError> {
    info!("Counting {}-mers of {} ({})", table.k(), path.display(), format);

    let (scratch, stats) = count_records(path, table.k(), format)?;
    table.absorb(scratch);

    info!(
        "Read {} records ({} bases), counted {} k-mers, {} distinct in table",
        stats.records,
        stats.bases,
        stats.kmers,
        table.len()
    );
    Ok(())
}

fn count_records(
    path: &Path,
    k: u8,
    format: RecordFormat,
) -> Result<(KeyMap<Count>, IngestStats), IoError> {
    let mut counts: KeyMap<Count> = new_key_map();
    let mut stats = IngestStats::default();

    let file = File::open(path).map_err(|e| {
        warn!("Can't open {}: {}", path.display(), e);
        IoError::CantOpenFile
    })?;

    let mut input = BufReader::new(file);
    let has_content = skip_leading_whitespace(&mut input).map_err(|e| {
        warn!("Can't read {}: {}", path.display(), e);
        IoError::ReadError
    })?;
    if !has_content {
        debug!("{} holds no records", path.display());
        return Ok((counts, stats));
    }

    let mut reader = match parse_fastx_reader(input) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Can't read sequences from {}: {}", path.display(), e);
            return Err(IoError::ReadError);
        }
    };

    while let Some(record) = reader.next() {
        let record = record.map_err(|e| {
            warn!("Malformed record in {}: {}", path.display(), e);
            IoError::ReadError
        })?;

        let found = if record.qual().is_some() {
            RecordFormat::Fastq
        } else {
            RecordFormat::Fasta
        };
        if found != format {
            warn!(
                "Expected {} records in {}, found {}",
                format,
                path.display(),
                found
            );
            return Err(IoError::ReadError);
        }

        let seq = record.seq();
        stats.records += 1;
        stats.bases += seq.len() as u64;
        for key in canonical_kmers(&seq, k) {
            let count = counts.entry(key).or_insert(0);
            *count = count.saturating_add(1);
            stats.kmers += 1;
        }
    }

    Ok((counts, stats))
}

/// Consume ASCII whitespace at the start of `input`; false if nothing else
/// follows
fn skip_leading_whitespace<R: BufRead>(input: &mut R) -> io::Result<bool> {
    loop {
        let buf = match input.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buf.is_empty() {
            return Ok(false);
        }
        let blank = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let done = blank < buf.len();
        input.consume(blank);
        if done {
            return Ok(true);
        }
    }
}
