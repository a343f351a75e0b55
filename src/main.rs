//! Data-Quality Validator
//!
//! Validates one exported batch of analytics events and writes the report.
//!
//! Usage:
//!   dq_validate --input events.csv --format csv --output-dir ./dq_report
//!
//! Environment:
//!   DQ_INPUT       - Input file (csv or jsonl)
//!   DQ_FORMAT      - Input format (default: csv)
//!   DQ_OUTPUT_DIR  - Report directory (default: ./dq_report)
//!   DQ_TIMEFIELD   - Event time column (default: event_timestamp)
//!   DQ_SAMPLE_SIZE - Max rows per sample (default: 100)
//!   DQ_FULL_OUTPUT - Also write every flagged row
//!   DQ_CONFIG      - TOML file with check settings
//!   RUST_LOG       - Log filter (default: event_dq=info,dq_validate=info)
//!
//! Exit codes:
//!   0 - report written
//!   1 - report written, batch failed and --gate was given
//!   2 - configuration or ingestion error
//!   3 - report write error

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use event_dq::ingest::{load_records, InputFormat};
use event_dq::quality::{DqConfig, Runner};
use event_dq::report_writer::{write_report, WriteOptions};

const DEFAULT_LOG_FILTER: &str = "event_dq=info,dq_validate=info";

#[derive(Parser, Debug)]
#[command(name = "dq_validate")]
#[command(about = "Data Quality Validation for event streams")]
struct Args {
    /// Path to input file (csv or jsonl)
    #[arg(long, env = "DQ_INPUT")]
    input: PathBuf,

    /// Input format
    #[arg(long, env = "DQ_FORMAT", default_value = "csv")]
    format: InputFormat,

    /// Directory the report is written to
    #[arg(long, alias = "output_dir", env = "DQ_OUTPUT_DIR", default_value = "./dq_report")]
    output_dir: PathBuf,

    /// Timestamp field name
    #[arg(long, env = "DQ_TIMEFIELD")]
    timefield: Option<String>,

    /// Sample size for the issue CSV and detail samples
    #[arg(long, alias = "sample_size", env = "DQ_SAMPLE_SIZE")]
    sample_size: Option<usize>,

    /// Write every flagged row to dq_full_issues.csv
    #[arg(long, alias = "full_output", env = "DQ_FULL_OUTPUT")]
    full_output: bool,

    /// TOML file with check settings (falls back to DQ_CONFIG_PATH, then defaults)
    #[arg(long, env = "DQ_CONFIG")]
    config: Option<PathBuf>,

    /// Exit with status 1 when the batch fails validation
    #[arg(long)]
    gate: bool,
}

impl Args {
    /// File settings first, then command-line overrides.
    fn resolve_config(&self) -> Result<DqConfig> {
        let mut config = match &self.config {
            Some(path) => DqConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => DqConfig::from_env(),
        };
        if let Some(timefield) = &self.timefield {
            config.time_field = timefield.clone();
        }
        if let Some(sample_size) = self.sample_size {
            config.sample_size = sample_size;
        }
        if self.full_output {
            config.full_output = true;
        }
        Ok(config)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let _ = dotenv();
    init_tracing();

    let args = Args::parse();

    let config = match args.resolve_config() {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };

    info!(
        input = %args.input.display(),
        format = %args.format,
        time_field = %config.time_field,
        sample_size = config.sample_size,
        full_output = config.full_output,
        "validating batch"
    );

    let records = match load_records(&args.input, args.format)
        .with_context(|| format!("Failed to load {}", args.input.display()))
    {
        Ok(r) => r,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error loading data: {:#}", e);
            std::process::exit(2);
        }
    };

    let options = WriteOptions::from_config(&args.output_dir, &config);
    let report = Runner::standard(config).run(&records);

    if let Err(e) = write_report(&report, &records, &options) {
        error!("{:#}", e);
        eprintln!("Error writing report: {:#}", e);
        std::process::exit(3);
    }

    print!("{}", report.format_summary());
    println!("DQ report generated in {}", args.output_dir.display());

    if args.gate && report.failed() {
        std::process::exit(1);
    }
}
