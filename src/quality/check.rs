//! Check trait and shared check inputs/outputs.
//!
//! A check reads the batch through a [`CheckContext`] and returns one
//! [`CheckResult`], filed in the report under the check's name. Checks never
//! write to the context, which is what lets the runner execute them in parallel.

use crate::quality::cardinality::CardinalityReport;
use crate::quality::config::DqConfig;
use crate::quality::profile::{IdentityNulls, TimestampFailures};
use crate::quality::records::RecordSet;
use crate::quality::revenue::{RevenueIssues, TypeIssue};
use crate::quality::sequence::SequenceResult;
use crate::quality::structural::NullCounts;
use crate::quality::timestamp::{Timestamp, TimestampCache};
use crate::quality::volume::VolumeReport;

// =============================================================================
// CHECK NAMES (report detail keys)
// =============================================================================

pub const REQUIRED_FIELDS: &str = "required_fields";
pub const NULL_COUNTS: &str = "null_counts";
pub const TYPE_ISSUES: &str = "type_issues";
pub const TIMESTAMPS: &str = "timestamps";
pub const DUPLICATE_TRANSACTIONS: &str = "duplicate_transactions";
pub const REVENUE: &str = "revenue";
pub const EVENT_SEQUENCE: &str = "event_sequence";
pub const VOLUME: &str = "volume";
pub const USER_CARDINALITY: &str = "user_cardinality";
pub const MALFORMED_EVENT_PROPERTIES: &str = "malformed_event_properties";
pub const CURRENCIES: &str = "currencies";
pub const IDENTITY_NULLS: &str = "identity_nulls";

// =============================================================================
// CONTEXT
// =============================================================================

/// Read-only inputs shared by every check in a run.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub records: &'a RecordSet,
    pub timestamps: &'a TimestampCache,
    pub config: &'a DqConfig,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        records: &'a RecordSet,
        timestamps: &'a TimestampCache,
        config: &'a DqConfig,
    ) -> Self {
        Self {
            records,
            timestamps,
            config,
        }
    }

    /// Parsed primary time field, one entry per row.
    pub fn event_times(&self) -> Option<&'a [Option<Timestamp>]> {
        self.timestamps.get(&self.config.time_field)
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// Output of one check. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// Required columns absent from the schema.
    MissingFields(Vec<String>),
    NullCounts(NullCounts),
    TypeIssues(Vec<TypeIssue>),
    TimestampFailures(TimestampFailures),
    /// Flagged row indices, in row order.
    Rows(Vec<usize>),
    Revenue(RevenueIssues),
    Sequence(SequenceResult),
    Volume(VolumeReport),
    Cardinality(CardinalityReport),
    /// Distinct currencies in first-seen order; `None` when the column is absent.
    Currencies(Option<Vec<String>>),
    IdentityNulls(IdentityNulls),
}

impl CheckResult {
    /// Flagged rows, for results that flag rows.
    pub fn rows(&self) -> Option<&[usize]> {
        match self {
            CheckResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// One unit of validation work.
pub trait Check: Send + Sync {
    /// Detail key the result is filed under.
    fn name(&self) -> &'static str;

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult;
}
