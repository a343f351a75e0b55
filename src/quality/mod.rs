//! Event Batch Data-Quality Checks
//!
//! Validation of one fully loaded batch of event records:
//! - Structural: required columns, null counts
//! - Integrity: duplicate identifiers, malformed embedded JSON
//! - Business rules: revenue validity, purchase-before-cart sequencing
//! - Statistical: daily volume anomalies, distinct-value spikes
//!
//! Checks run in parallel over a shared, read-only record set and timestamp
//! cache; the report aggregator derives the verdict from a fixed set of gates.

pub mod cardinality;
pub mod check;
pub mod config;
pub mod integrity;
pub mod profile;
pub mod records;
pub mod report;
pub mod revenue;
pub mod runner;
pub mod sequence;
pub mod structural;
pub mod timestamp;
pub mod volume;


pub use check::{Check, CheckContext, CheckResult};
pub use config::DqConfig;
pub use records::{EventRecord, RecordSet, Schema};
pub use report::{FailReason, Report, ReportSummary};
pub use runner::Runner;
pub use timestamp::{parse_timestamp, Timestamp, TimestampCache};
