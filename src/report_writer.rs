//! Report Persistence
//!
//! Writes a finished [`Report`] into an output directory:
//!
//! - `dq_summary.json`: pretty-printed `{summary, details}` document
//! - `dq_issues_sample.csv`: original rows flagged by the row-level checks,
//!   capped at the sample size (empty file when nothing is flagged)
//! - `dq_full_issues.csv`: every flagged row, only with `full_output` and
//!   only when something is flagged

use crate::quality::config::DqConfig;
use crate::quality::records::RecordSet;
use crate::quality::report::Report;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SUMMARY_FILE: &str = "dq_summary.json";
pub const SAMPLE_FILE: &str = "dq_issues_sample.csv";
pub const FULL_FILE: &str = "dq_full_issues.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub output_dir: PathBuf,
    pub sample_size: usize,
    pub full_output: bool,
}

impl WriteOptions {
    pub fn from_config(output_dir: impl Into<PathBuf>, config: &DqConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            sample_size: config.sample_size,
            full_output: config.full_output,
        }
    }
}

/// Paths written and how many rows went into each CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    pub summary: PathBuf,
    pub sample: PathBuf,
    pub sample_rows: usize,
    pub full: Option<PathBuf>,
    pub full_rows: usize,
}

pub fn write_report(
    report: &Report,
    records: &RecordSet,
    options: &WriteOptions,
) -> Result<WrittenReport> {
    let dir = &options.output_dir;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let summary = dir.join(SUMMARY_FILE);
    let document = serde_json::to_string_pretty(&report.document(options.sample_size))?;
    fs::write(&summary, document)
        .with_context(|| format!("Failed to write {}", summary.display()))?;

    let sample = dir.join(SAMPLE_FILE);
    let sample_rows: Vec<usize> = report
        .flagged_rows(Some(options.sample_size))
        .into_iter()
        .take(options.sample_size)
        .collect();
    if sample_rows.is_empty() {
        fs::write(&sample, "").with_context(|| format!("Failed to write {}", sample.display()))?;
    } else {
        write_rows(&sample, records, &sample_rows)?;
    }

    let mut full = None;
    let mut full_rows = 0;
    if options.full_output {
        let rows = report.flagged_rows(None);
        if !rows.is_empty() {
            let path = dir.join(FULL_FILE);
            write_rows(&path, records, &rows)?;
            full_rows = rows.len();
            full = Some(path);
        }
    }

    info!(
        dir = %dir.display(),
        sample_rows = sample_rows.len(),
        full_rows,
        "report written"
    );

    Ok(WrittenReport {
        summary,
        sample,
        sample_rows: sample_rows.len(),
        full,
        full_rows,
    })
}

/// Write the selected original rows, header first. Nulls become empty cells.
fn write_rows(path: &Path, records: &RecordSet, rows: &[usize]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(records.schema().columns())?;
    for record in rows.iter().filter_map(|&row| records.get(row)) {
        writer.write_record(record.values().iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
