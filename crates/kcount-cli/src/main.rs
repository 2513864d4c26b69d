use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use kcount_lib::{dump, Count, CountConfiguration, CountTable, RecordFormat, SolidSet, Spectrum, ThresholdMethod};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// Size of the `threshold --plot` drawing
const PLOT_WIDTH: usize = 100;
const PLOT_HEIGHT: usize = 24;

#[derive(Parser)]
#[command(name = "kcount")]
#[command(version = "0.1.0")]
#[command(about = "kcount: saturating k-mer counter", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count k-mers of FASTA/FASTQ files
    Count {
        /// K-mer length, in [1, 31]
        #[arg(short, long)]
        k: u8,

        /// Input FASTA/FASTQ files (may be gzipped)
        #[arg(short, long, required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Inputs are FASTQ instead of FASTA
        #[arg(long, default_value = "false")]
        fastq: bool,

        /// Binary count table output
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        outputs: Outputs,
    },

    /// Emit dumps of a saved count table
    Dump {
        /// Binary count table
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        outputs: Outputs,
    },

    /// Print the abundance threshold chosen from the spectrum of a count table
    Threshold {
        /// Binary count table
        #[arg(short, long)]
        input: PathBuf,

        /// Threshold selection method
        #[arg(short, long, value_enum, default_value_t = Method::FirstMinimum)]
        method: Method,

        /// Method parameter (fraction in [0, 1] for rarefaction and percent methods)
        #[arg(short, long, default_value = "0.0")]
        param: f64,

        /// Also draw the spectrum, with the threshold marked, on stderr
        #[arg(long, default_value = "false")]
        plot: bool,
    },
}

/// Outputs shared by `count` and `dump`
#[derive(Args)]
struct Outputs {
    /// Minimal count of a k-mer to be dumped or marked solid
    #[arg(short, long, default_value = "0")]
    abundance: Count,

    /// CSV output, one `kmer,count` line per k-mer
    #[arg(short, long)]
    csv: Option<PathBuf>,

    /// Solid k-mer list, one k-mer per line
    #[arg(short, long)]
    solid: Option<PathBuf>,

    /// Spectrum CSV, one `count,number` line per observed count
    #[arg(short = 'S', long)]
    spectrum: Option<PathBuf>,

    /// Binary solid set output
    #[arg(long)]
    solid_bin: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    FirstMinimum,
    Rarefaction,
    PercentAtMost,
    PercentAtLeast,
}

impl From<Method> for ThresholdMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::FirstMinimum => ThresholdMethod::FirstMinimum,
            Method::Rarefaction => ThresholdMethod::Rarefaction,
            Method::PercentAtMost => ThresholdMethod::PercentAtMost,
            Method::PercentAtLeast => ThresholdMethod::PercentAtLeast,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Count { k, inputs, fastq, output, outputs } => {
            count_command(k, &inputs, fastq, output.as_deref(), &outputs)?;
        }
        Commands::Dump { input, outputs } => {
            dump_command(&input, &outputs)?;
        }
        Commands::Threshold { input, method, param, plot } => {
            threshold_command(&input, method, param, plot)?;
        }
    }

    Ok(())
}

/// Count k-mers of every input, then save and dump the table
fn count_command(
    k: u8,
    inputs: &[PathBuf],
    fastq: bool,
    output: Option<&Path>,
    outputs: &Outputs,
) -> anyhow::Result<()> {
    let config = CountConfiguration {
        k,
        abundance: outputs.abundance,
        record_format: if fastq { RecordFormat::Fastq } else { RecordFormat::Fasta },
    };
    config.validate()?;
    config.print();

    let counter = config.count(inputs).context("Failed to count k-mers")?;
    info!("Counted {} distinct k-mers", counter.len());

    match output {
        Some(path) => counter
            .serialize(path)
            .with_context(|| format!("Failed to save count table to {}", path.display()))?,
        None if outputs.is_empty() => warn!("No output requested, counts are discarded"),
        None => {}
    }

    write_outputs(&counter, outputs)
}

/// Reload a count table and dump it
fn dump_command(input: &Path, outputs: &Outputs) -> anyhow::Result<()> {
    let counter = load_counter(input)?;
    if outputs.is_empty() {
        warn!("No output requested");
    }
    write_outputs(&counter, outputs)
}

/// Print the threshold chosen by `method`
fn threshold_command(input: &Path, method: Method, param: f64, plot: bool) -> anyhow::Result<()> {
    let counter = load_counter(input)?;
    let spectrum = Spectrum::from_counter(&counter);
    let threshold = spectrum.get_threshold(method.into(), param);

    if plot {
        spectrum.write_histogram(std::io::stderr().lock(), PLOT_WIDTH, PLOT_HEIGHT, threshold)?;
    }

    match threshold {
        Some(threshold) => println!("{}", threshold),
        None => anyhow::bail!("No threshold found in the spectrum of {}", input.display()),
    }
    Ok(())
}

fn load_counter(input: &Path) -> anyhow::Result<CountTable> {
    CountTable::deserialize(input)
        .with_context(|| format!("Failed to load count table from {}", input.display()))
}

impl Outputs {
    fn is_empty(&self) -> bool {
        self.csv.is_none() && self.solid.is_none() && self.spectrum.is_none() && self.solid_bin.is_none()
    }
}

fn write_outputs(counter: &CountTable, outputs: &Outputs) -> anyhow::Result<()> {
    let abundance = outputs.abundance;

    if let Some(path) = &outputs.csv {
        dump::csv(counter, abundance, path)
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
    }
    if let Some(path) = &outputs.solid {
        dump::solid(counter, abundance, path)
            .with_context(|| format!("Failed to write solid k-mers to {}", path.display()))?;
    }
    if let Some(path) = &outputs.spectrum {
        dump::spectrum(counter, path)
            .with_context(|| format!("Failed to write spectrum to {}", path.display()))?;
    }
    if let Some(path) = &outputs.solid_bin {
        SolidSet::from_counter(counter, abundance)
            .serialize(path)
            .with_context(|| format!("Failed to save solid set to {}", path.display()))?;
    }

    Ok(())
}
