//! K-mer abundance spectrum
//!
//! The spectrum of a count table is the number of distinct k-mers seen
//! exactly `c` times, for every `c`. Erroneous k-mers pile up at low counts
//! with a steeply decreasing (Pareto-like) shape, while genuine k-mers form
//! one or more bumps further right. [`Spectrum::get_threshold`] picks an
//! abundance cutting between the two.

use crate::count_table::{Count, CountTable};
use std::io::{self, Write};

/// Strategy to choose a solidity threshold from the spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdMethod {
    /// Count at the first local minimum of the spectrum
    FirstMinimum,

    /// First count whose k-mers weigh less than `param` of the occurrences
    /// accumulated up to it
    Rarefaction,

    /// Highest count removing at most a `param` fraction of occurrences
    PercentAtMost,

    /// Lowest count removing at least a `param` fraction of occurrences
    PercentAtLeast,
}

/// Histogram of counts, `data[c]` being the number of keys with count `c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spectrum {
    data: Vec<u64>,
}

impl Spectrum {
    /// Compute the spectrum of `counter`
    pub fn from_counter(counter: &CountTable) -> Self {
        let max = counter.iter().map(|(_, count)| count).max().unwrap_or(0);
        let mut data = vec![0u64; max as usize + 1];
        for (_, count) in counter.iter() {
            data[count as usize] += 1;
        }
        Self { data }
    }

    #[cfg(test)]
    fn from_histogram(data: Vec<u64>) -> Self {
        Self { data }
    }

    /// Observed `(count, number of keys)` pairs, ascending by count
    pub fn histogram(&self) -> impl Iterator<Item = (Count, u64)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(c, &n)| (c as Count, n))
    }

    /// Write one `count,number` line per observed count
    pub fn write_csv<W: Write>(&self, writer: W) -> io::Result<()> {
        let mut csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        for (count, n) in self.histogram() {
            csv.write_record(&[count.to_string(), n.to_string()])?;
        }
        csv.flush()
    }

    /// Draw the spectrum as a text plot of `height` rows over counts
    /// `0..width`, on a log scale, followed by an axis line
    ///
    /// `point` is marked with `*` on the axis, multiples of 5 with `|`.
    pub fn write_histogram<W: Write>(
        &self,
        mut out: W,
        width: usize,
        height: usize,
        point: Option<Count>,
    ) -> io::Result<()> {
        let columns: Vec<u64> = (0..width)
            .map(|c| self.data.get(c).copied().unwrap_or(0))
            .collect();
        let top = (columns.iter().copied().max().unwrap_or(0) as f64 + 1.0).log10();

        let bars: Vec<f64> = columns
            .iter()
            .map(|&n| {
                if n == 0 {
                    0.0
                } else {
                    (n as f64 + 1.0).log10() / top * height as f64
                }
            })
            .collect();

        let mut line = String::with_capacity(width * 3);
        for row in (1..=height).rev() {
            line.clear();
            let row = row as f64;
            for &bar in &bars {
                line.push(if bar >= row {
                    '\u{258c}'
                } else if bar >= row - 0.5 {
                    '\u{2596}'
                } else {
                    ' '
                });
            }
            writeln!(out, "{}", line)?;
        }

        line.clear();
        for c in 0..width {
            line.push(match point {
                Some(p) if p as usize == c => '*',
                _ if c % 5 == 0 => '|',
                _ => '-',
            });
        }
        writeln!(out, "{}", line)
    }

    /// Choose an abundance threshold, `None` if the method finds none
    pub fn get_threshold(&self, method: ThresholdMethod, param: f64) -> Option<Count> {
        match method {
            ThresholdMethod::FirstMinimum => self.first_minimum(),
            ThresholdMethod::Rarefaction => self.rarefaction(param),
            ThresholdMethod::PercentAtMost => self.percent_at_most(param),
            ThresholdMethod::PercentAtLeast => self.percent_at_least(param),
        }
    }

    fn first_minimum(&self) -> Option<Count> {
        // The descent starts at the lowest observed count
        let start = self.data.iter().position(|&n| n > 0)?;
        self.data
            .windows(2)
            .enumerate()
            .skip(start)
            .find(|(_, pair)| pair[1] > pair[0])
            .map(|(c, _)| c as Count)
    }

    fn rarefaction(&self, limit: f64) -> Option<Count> {
        let mut cumulative = 0u64;
        for (c, &n) in self.data.iter().enumerate().skip(1) {
            cumulative += c as u64 * n;
            if (n as f64 / cumulative as f64) < limit {
                return Some(c as Count);
            }
        }
        None
    }

    fn percent_at_most(&self, fraction: f64) -> Option<Count> {
        self.percent_at_least(fraction)
            .map(|c| c.saturating_sub(1))
    }

    fn percent_at_least(&self, fraction: f64) -> Option<Count> {
        let total: u64 = self
            .data
            .iter()
            .enumerate()
            .map(|(c, &n)| c as u64 * n)
            .sum();

        let mut cumulative = 0u64;
        for (c, &n) in self.data.iter().enumerate() {
            cumulative += c as u64 * n;
            if (cumulative as f64 / total as f64) > fraction {
                return Some(c as Count);
            }
        }
        None
    }
}
