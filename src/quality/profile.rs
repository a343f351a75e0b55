//! Batch profile checks: timestamp parse failures, currencies in use and
//! identity-key nulls. None of these gate the verdict.

use crate::quality::check::{
    Check, CheckContext, CheckResult, CURRENCIES, IDENTITY_NULLS, TIMESTAMPS,
};
use crate::quality::records::RecordSet;
use crate::quality::structural::null_count;
use crate::quality::timestamp::Timestamp;
use serde::Serialize;
use std::collections::HashSet;

// =============================================================================
// TIMESTAMP PARSE FAILURES
// =============================================================================

/// Rows whose primary time value did not parse. Nulls count as failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimestampFailures {
    /// False when the time column is absent; `rows` is then empty.
    pub field_present: bool,
    pub rows: Vec<usize>,
}

impl TimestampFailures {
    /// Failure count, or `None` when the time column is absent.
    pub fn bad_count(&self) -> Option<usize> {
        self.field_present.then_some(self.rows.len())
    }
}

pub fn timestamp_failures(parsed: Option<&[Option<Timestamp>]>) -> TimestampFailures {
    match parsed {
        None => TimestampFailures::default(),
        Some(parsed) => TimestampFailures {
            field_present: true,
            rows: parsed
                .iter()
                .enumerate()
                .filter(|(_, ts)| ts.is_none())
                .map(|(row, _)| row)
                .collect(),
        },
    }
}

pub struct TimestampParseCheck;

impl Check for TimestampParseCheck {
    fn name(&self) -> &'static str {
        TIMESTAMPS
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::TimestampFailures(timestamp_failures(ctx.event_times()))
    }
}

// =============================================================================
// CURRENCIES
// =============================================================================

/// Distinct non-null values of `field` in first-seen order, or `None` when the
/// column is absent.
pub fn unique_values(records: &RecordSet, field: &str) -> Option<Vec<String>> {
    let column = records.column(field)?;
    let mut seen = HashSet::new();
    Some(
        column
            .filter_map(|(_, value)| value)
            .filter(|value| seen.insert(*value))
            .map(String::from)
            .collect(),
    )
}

pub struct CurrencyCheck;

impl Check for CurrencyCheck {
    fn name(&self) -> &'static str {
        CURRENCIES
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::Currencies(unique_values(ctx.records, &ctx.config.currency_field))
    }
}

// =============================================================================
// IDENTITY NULLS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IdentityNulls {
    pub user_id_nulls: Option<usize>,
    pub client_id_nulls: Option<usize>,
}

pub struct IdentityNullsCheck;

impl Check for IdentityNullsCheck {
    fn name(&self) -> &'static str {
        IDENTITY_NULLS
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::IdentityNulls(IdentityNulls {
            user_id_nulls: null_count(ctx.records, &ctx.config.primary_identity_field),
            client_id_nulls: null_count(ctx.records, &ctx.config.secondary_identity_field),
        })
    }
}
