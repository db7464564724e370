//! seqframe: inspect, partition and reduce Norpix SEQ files.
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for per-partition output.
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand, ValueEnum};
use ndarray::Ix2;
use seqframe_core::DataSet;
use seqframe_io::{DatasetParams, ReadConfig, ResultFileWriter, SeqDataset};
use seqframe_jobs::{run_job, RunOptions, SumFramesJob};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    SeqIo(#[from] seqframe_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] seqframe_core::Error),

    #[error("Job error: {0}")]
    Job(#[from] seqframe_jobs::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} is not a readable SEQ file")]
    NotSeq(PathBuf),

    #[error("result has unexpected shape {0:?}")]
    ResultShape(Vec<usize>),
}

/// Output encoding for reduced results.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Comma-separated rows
    Csv,
    /// Raw little-endian f32, row-major
    Bin,
}

/// Partitioned access to Norpix SEQ detector files.
#[derive(Parser)]
#[command(name = "seqframe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields and derived geometry of a SEQ file
    Info {
        /// Input SEQ file
        input: PathBuf,

        /// Navigation shape; defaults to one axis over all frames
        #[arg(long, value_delimiter = ',')]
        scan_size: Option<Vec<usize>>,

        /// Print diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Suggest dataset parameters for a file
    Detect {
        /// Input file
        input: PathBuf,
    },

    /// List the partitions a dataset would be split into
    Partitions {
        /// Input SEQ file
        input: PathBuf,

        /// Navigation shape, e.g. `32,32`
        #[arg(long, value_delimiter = ',')]
        scan_size: Option<Vec<usize>>,

        /// Worker count used to size partitions
        #[arg(long)]
        workers: Option<usize>,

        /// Fixed number of partitions
        #[arg(long)]
        partitions: Option<usize>,
    },

    /// Sum all frames into a single image
    Sum {
        /// Input SEQ file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format; guessed from the extension if omitted
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Navigation shape, e.g. `32,32`
        #[arg(long, value_delimiter = ',')]
        scan_size: Option<Vec<usize>>,

        /// Worker threads
        #[arg(short, long)]
        threads: Option<usize>,

        /// Decoded bytes per tile
        #[arg(long)]
        tile_bytes: Option<usize>,

        /// Fixed number of partitions
        #[arg(long)]
        partitions: Option<usize>,

        /// Apply dark/gain corrections found next to the input
        #[arg(long)]
        corrections: bool,
    },
}

/// Builds parameters from an explicit scan size, or from detection.
fn params_for(input: PathBuf, scan_size: Option<Vec<usize>>) -> Result<DatasetParams> {
    match scan_size {
        Some(scan_size) => Ok(DatasetParams::new(input, scan_size)),
        None => SeqDataset::detect_params(&input)
            .map(|detected| detected.parameters)
            .ok_or(CliError::NotSeq(input)),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info {
            input,
            scan_size,
            json,
        } => {
            let dataset = SeqDataset::open(&params_for(input, scan_size)?)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&dataset.diagnostics())?
                );
            } else {
                println!("{}", dataset);
                for diagnostic in dataset.diagnostics() {
                    println!("{:<24} {}", diagnostic.name, diagnostic.value);
                }
            }
        }

        Commands::Detect { input } => match SeqDataset::detect_params(&input) {
            Some(detected) => println!("{}", serde_json::to_string_pretty(&detected)?),
            None => {
                println!("false");
            }
        },

        Commands::Partitions {
            input,
            scan_size,
            workers,
            partitions,
        } => {
            let config = ReadConfig::default();
            let mut dataset = SeqDataset::open(&params_for(input, scan_size)?)?
                .with_workers(workers.unwrap_or_else(|| config.effective_parallelism()));
            if let Some(count) = partitions {
                dataset = dataset.with_partition_count(count);
            }
            println!("{}", dataset);
            println!("{:<6} {:>12} {:>12} {:>10}", "part", "start", "stop", "frames");
            for (i, partition) in dataset.partitions()?.iter().enumerate() {
                let range = partition.frame_range();
                println!(
                    "{:<6} {:>12} {:>12} {:>10}",
                    i,
                    range.start,
                    range.end,
                    partition.num_frames()
                );
            }
        }

        Commands::Sum {
            input,
            output,
            format,
            scan_size,
            threads,
            tile_bytes,
            partitions,
            corrections,
        } => {
            let mut config = ReadConfig::default();
            if let Some(workers) = threads {
                config = config.try_with_parallelism(workers)?;
            }
            if let Some(bytes) = tile_bytes {
                config = config.try_with_tile_bytes(bytes)?;
            }
            let options = RunOptions::from_config(&config)?;

            let mut dataset = SeqDataset::open(&params_for(input, scan_size)?)?
                .with_workers(options.parallelism);
            if let Some(count) = partitions {
                dataset = dataset.with_partition_count(count);
            }

            let start = Instant::now();
            let job = SumFramesJob::new(&dataset)?.with_corrections(corrections);
            let result = run_job(&job, &options)?;
            let shape = result.shape().to_vec();
            let image = result
                .into_dimensionality::<Ix2>()
                .map_err(|_| CliError::ResultShape(shape))?;

            let format = format.unwrap_or_else(|| {
                match output.extension().and_then(|ext| ext.to_str()) {
                    Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
                    _ => OutputFormat::Bin,
                }
            });
            let mut writer = ResultFileWriter::create(&output)?;
            match format {
                OutputFormat::Csv => writer.write_csv(&image)?,
                OutputFormat::Bin => writer.write_binary(&image)?,
            }

            println!(
                "Summed {} frames in {} partitions in {:.2}s",
                dataset.geometry().frame_count,
                job.partitions().len(),
                start.elapsed().as_secs_f64()
            );
            println!("Wrote {} ({:?})", output.display(), format);
        }
    }

    Ok(())
}
