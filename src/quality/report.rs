//! Report Aggregator
//!
//! Merges the per-check results into one report with a pass/fail verdict.
//!
//! # Gating
//!
//! Only five conditions fail a batch, always reported in this order:
//!
//! | reason                    | condition                              |
//! |---------------------------|----------------------------------------|
//! | `required_fields_missing` | a required column is absent            |
//! | `duplicate_transactions`  | any identifier occurs more than once   |
//! | `revenue_has_nulls`       | any revenue value failed coercion      |
//! | `negative_revenue`        | any revenue value is below zero        |
//! | `volume_anomalies`        | any daily volume bucket was flagged    |
//!
//! Everything else (malformed properties, sequence violations, cardinality
//! spikes, zero revenue, timestamp failures, type issues, currencies, identity
//! nulls) is reported in the details and never affects the verdict.

use crate::quality::check::{
    CheckResult, CURRENCIES, DUPLICATE_TRANSACTIONS, EVENT_SEQUENCE, IDENTITY_NULLS,
    MALFORMED_EVENT_PROPERTIES, NULL_COUNTS, REQUIRED_FIELDS, REVENUE, TIMESTAMPS, TYPE_ISSUES,
    USER_CARDINALITY, VOLUME,
};
use crate::quality::revenue::RevenueIssues;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{info, warn};

// =============================================================================
// VERDICT
// =============================================================================

/// Named reason for a failed verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailReason {
    RequiredFieldsMissing,
    DuplicateTransactions,
    RevenueHasNulls,
    NegativeRevenue,
    VolumeAnomalies,
}

impl FailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailReason::RequiredFieldsMissing => "required_fields_missing",
            FailReason::DuplicateTransactions => "duplicate_transactions",
            FailReason::RevenueHasNulls => "revenue_has_nulls",
            FailReason::NegativeRevenue => "negative_revenue",
            FailReason::VolumeAnomalies => "volume_anomalies",
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub failed: bool,
    pub fail_reasons: Vec<FailReason>,
    pub required_fields_present: bool,
}

// =============================================================================
// REPORT
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub summary: ReportSummary,
    pub details: BTreeMap<String, CheckResult>,
}

impl Report {
    /// Build the report and its verdict from the per-check results.
    ///
    /// A gating check that did not run contributes no reason.
    pub fn aggregate(details: BTreeMap<String, CheckResult>) -> Self {
        let missing_fields = match details.get(REQUIRED_FIELDS) {
            Some(CheckResult::MissingFields(missing)) => missing.len(),
            _ => 0,
        };
        let duplicates = details
            .get(DUPLICATE_TRANSACTIONS)
            .and_then(CheckResult::rows)
            .map_or(0, <[usize]>::len);
        let revenue = match details.get(REVENUE) {
            Some(CheckResult::Revenue(issues)) => Some(issues),
            _ => None,
        };
        let volume_anomalies = matches!(
            details.get(VOLUME),
            Some(CheckResult::Volume(volume)) if volume.has_anomalies()
        );

        let gates = [
            (FailReason::RequiredFieldsMissing, missing_fields > 0),
            (FailReason::DuplicateTransactions, duplicates > 0),
            (
                FailReason::RevenueHasNulls,
                revenue.is_some_and(|r| !r.nan().is_empty()),
            ),
            (
                FailReason::NegativeRevenue,
                revenue.is_some_and(|r| !r.negative().is_empty()),
            ),
            (FailReason::VolumeAnomalies, volume_anomalies),
        ];
        let fail_reasons: Vec<FailReason> = gates
            .into_iter()
            .filter(|(_, tripped)| *tripped)
            .map(|(reason, _)| reason)
            .collect();

        let summary = ReportSummary {
            failed: !fail_reasons.is_empty(),
            fail_reasons,
            required_fields_present: missing_fields == 0,
        };
        if summary.failed {
            warn!(reasons = ?summary.fail_reasons, "batch failed data-quality gate");
        } else {
            info!("batch passed data-quality gate");
        }

        Self { summary, details }
    }

    pub fn passed(&self) -> bool {
        !self.summary.failed
    }

    pub fn failed(&self) -> bool {
        self.summary.failed
    }

    pub fn detail(&self, check: &str) -> Option<&CheckResult> {
        self.details.get(check)
    }

    /// Rows flagged by the row-level checks whose rows are written out:
    /// timestamp parse failures, duplicate identifiers, revenue buckets and
    /// malformed properties. Each source list is cut to `per_source_cap` first
    /// when given. Sorted, without repeats.
    pub fn flagged_rows(&self, per_source_cap: Option<usize>) -> Vec<usize> {
        let cap = per_source_cap.unwrap_or(usize::MAX);
        let mut sources: Vec<&[usize]> = Vec::new();

        if let Some(CheckResult::TimestampFailures(failures)) = self.detail(TIMESTAMPS) {
            sources.push(&failures.rows);
        }
        if let Some(rows) = self.detail(DUPLICATE_TRANSACTIONS).and_then(CheckResult::rows) {
            sources.push(rows);
        }
        if let Some(CheckResult::Revenue(issues)) = self.detail(REVENUE) {
            sources.extend([issues.nan(), issues.negative(), issues.zero()]);
        }
        if let Some(rows) = self.detail(MALFORMED_EVENT_PROPERTIES).and_then(CheckResult::rows) {
            sources.push(rows);
        }

        sources
            .into_iter()
            .flat_map(|rows| rows.iter().take(cap).copied())
            .collect::<BTreeSet<usize>>()
            .into_iter()
            .collect()
    }

    /// JSON document `{summary, details}`; every row list is reported as a
    /// count plus a sample of at most `sample_size` entries.
    pub fn document(&self, sample_size: usize) -> Value {
        let details: serde_json::Map<String, Value> = self
            .details
            .iter()
            .map(|(name, result)| (name.clone(), detail_document(result, sample_size)))
            .collect();
        json!({
            "summary": self.summary,
            "details": details,
        })
    }

    /// Format as compact summary.
    pub fn format_summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== DATA QUALITY REPORT ===\n");
        out.push_str(&format!("Status: {}\n", if self.failed() { "FAIL" } else { "PASS" }));
        if self.failed() {
            let reasons: Vec<&str> = self
                .summary
                .fail_reasons
                .iter()
                .map(FailReason::as_str)
                .collect();
            out.push_str(&format!("Fail reasons: {}\n", reasons.join(", ")));
        }
        out.push('\n');

        for (name, result) in &self.details {
            out.push_str(&format!("[{}] {}\n", name, describe(result)));
        }

        out.push_str("===========================\n");
        out
    }
}

fn sample<T: Clone>(items: &[T], sample_size: usize) -> Vec<T> {
    items.iter().take(sample_size).cloned().collect()
}

fn rows_document(rows: &[usize], sample_size: usize) -> Value {
    json!({
        "count": rows.len(),
        "sample": sample(rows, sample_size),
    })
}

fn detail_document(result: &CheckResult, sample_size: usize) -> Value {
    match result {
        CheckResult::MissingFields(missing) => json!({
            "missing_fields": missing,
            "present": missing.is_empty(),
        }),
        CheckResult::NullCounts(counts) => json!(counts),
        CheckResult::TypeIssues(issues) => json!(issues),
        CheckResult::TimestampFailures(failures) => json!({
            "bad_count": failures.bad_count(),
            "sample": sample(&failures.rows, sample_size),
        }),
        CheckResult::Rows(rows) => rows_document(rows, sample_size),
        CheckResult::Revenue(RevenueIssues::MissingField) => json!({ "missing_value_field": true }),
        CheckResult::Revenue(issues) => json!({
            "summary": {
                "nan": issues.nan().len(),
                "negative": issues.negative().len(),
                "zero": issues.zero().len(),
            },
            "sample": {
                "nan": sample(issues.nan(), sample_size),
                "negative": sample(issues.negative(), sample_size),
                "zero": sample(issues.zero(), sample_size),
            },
        }),
        CheckResult::Sequence(sequence) => json!({
            "identity_field": sequence.identity.name(),
            "skipped": sequence.skipped,
            "count": sequence.violations.len(),
            "sample": sample(&sequence.violations, sample_size),
        }),
        CheckResult::Volume(volume) => json!({
            "by_period": volume.by_period,
            "anomalies": volume.anomalies,
            "mean": volume.stats.mean,
            "std_dev": volume.stats.std_dev,
            "sigma": volume.sigma,
            "threshold": volume.threshold(),
        }),
        CheckResult::Cardinality(cardinality) => json!(cardinality),
        CheckResult::Currencies(currencies) => json!(currencies),
        CheckResult::IdentityNulls(nulls) => json!(nulls),
    }
}

fn describe(result: &CheckResult) -> String {
    match result {
        CheckResult::MissingFields(missing) if missing.is_empty() => "all present".to_string(),
        CheckResult::MissingFields(missing) => format!("missing: {}", missing.join(", ")),
        CheckResult::NullCounts(counts) => {
            let parts: Vec<String> = counts
                .iter()
                .map(|(field, count)| match count {
                    Some(n) => format!("{}={}", field, n),
                    None => format!("{}=n/a", field),
                })
                .collect();
            parts.join(" ")
        }
        CheckResult::TypeIssues(issues) if issues.is_empty() => "OK".to_string(),
        CheckResult::TypeIssues(issues) => issues
            .iter()
            .map(|issue| format!("{}: {}", issue.check, issue.message))
            .collect::<Vec<_>>()
            .join("; "),
        CheckResult::TimestampFailures(failures) => match failures.bad_count() {
            Some(n) => format!("{} unparseable", n),
            None => "time field absent".to_string(),
        },
        CheckResult::Rows(rows) => format!("{} rows flagged", rows.len()),
        CheckResult::Revenue(RevenueIssues::MissingField) => "revenue field absent".to_string(),
        CheckResult::Revenue(issues) => format!(
            "nan={} negative={} zero={}",
            issues.nan().len(),
            issues.negative().len(),
            issues.zero().len()
        ),
        CheckResult::Sequence(sequence) if sequence.skipped => "skipped".to_string(),
        CheckResult::Sequence(sequence) => format!("{} violations", sequence.violations.len()),
        CheckResult::Volume(volume) => format!(
            "{} days, {} anomalies",
            volume.by_period.len(),
            volume.anomalies.len()
        ),
        CheckResult::Cardinality(cardinality) => format!(
            "{} days, {} spikes",
            cardinality.by_period.len(),
            cardinality.spikes.len()
        ),
        CheckResult::Currencies(Some(currencies)) => currencies.join(", "),
        CheckResult::Currencies(None) => "currency field absent".to_string(),
        CheckResult::IdentityNulls(nulls) => format!(
            "user_id_nulls={:?} client_id_nulls={:?}",
            nulls.user_id_nulls, nulls.client_id_nulls
        ),
    }
}

/// Detail keys in the order the checks are described, for callers listing
/// every check.
pub const DETAIL_KEYS: [&str; 12] = [
    REQUIRED_FIELDS,
    NULL_COUNTS,
    TYPE_ISSUES,
    TIMESTAMPS,
    DUPLICATE_TRANSACTIONS,
    REVENUE,
    EVENT_SEQUENCE,
    VOLUME,
    USER_CARDINALITY,
    MALFORMED_EVENT_PROPERTIES,
    CURRENCIES,
    IDENTITY_NULLS,
];
