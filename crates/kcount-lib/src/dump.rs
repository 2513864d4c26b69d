//! Text dumps of a count table
//!
//! Every dump is written atomically: on failure the destination is left as
//! it was.

use crate::count_table::{Count, CountTable};
use crate::error::IoError;
use crate::kmer::decode;
use crate::serialization::write_atomically;
use crate::spectrum::Spectrum;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

fn csv_writer(writer: &mut dyn Write) -> csv::Writer<&mut dyn Write> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer)
}

/// Write `<k-mer>,<count>` for every k-mer with a count of at least
/// `abundance`, in table order
pub fn csv<P: AsRef<Path>>(counter: &CountTable, abundance: Count, path: P) -> Result<(), IoError> {
    let path = path.as_ref();
    write_atomically(path, |w| write_csv(counter, abundance, w))?;
    info!("Wrote k-mer counts to {}", path.display());
    Ok(())
}

/// Write every k-mer with a count of at least `abundance`, one per line
pub fn solid<P: AsRef<Path>>(
    counter: &CountTable,
    abundance: Count,
    path: P,
) -> Result<(), IoError> {
    let path = path.as_ref();
    write_atomically(path, |w| write_solid(counter, abundance, w))?;
    info!("Wrote solid k-mers to {}", path.display());
    Ok(())
}

/// Write `<count>,<number of k-mers>` for every observed count, ascending
pub fn spectrum<P: AsRef<Path>>(counter: &CountTable, path: P) -> Result<(), IoError> {
    let path = path.as_ref();
    let spectrum = Spectrum::from_counter(counter);
    write_atomically(path, |w| spectrum.write_csv(w))?;
    info!("Wrote k-mer spectrum to {}", path.display());
    Ok(())
}

/// CSV dump to any writer
pub fn write_csv(counter: &CountTable, abundance: Count, writer: &mut dyn Write) -> io::Result<()> {
    let k = counter.k();
    let mut csv = csv_writer(writer);
    for (key, count) in counter.iter().filter(|&(_, c)| c >= abundance) {
        csv.write_record(&[decode(key, k), count.to_string()])?;
    }
    csv.flush()
}

/// Solid list dump to any writer
pub fn write_solid(counter: &CountTable, abundance: Count, writer: &mut dyn Write) -> io::Result<()> {
    let k = counter.k();
    let mut csv = csv_writer(writer);
    for (key, _) in counter.iter().filter(|&(_, c)| c >= abundance) {
        csv.write_record(&[decode(key, k)])?;
    }
    csv.flush()
}
