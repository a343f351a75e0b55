//! Referential integrity checks
//!
//! - **Duplicate identifiers**: an identifier that appears more than once is
//!   reported with *every* occurrence, so downstream readers see the whole
//!   collision rather than "all but the first".
//! - **Malformed embedded JSON**: per-row property blobs that do not parse.
//!
//! Both degrade to an empty result when their column is absent.

use crate::quality::check::{
    Check, CheckContext, CheckResult, DUPLICATE_TRANSACTIONS, MALFORMED_EVENT_PROPERTIES,
};
use crate::quality::records::RecordSet;
use std::collections::HashMap;
use tracing::debug;

// =============================================================================
// DUPLICATE IDENTIFIERS
// =============================================================================

/// Rows whose non-null `field` value occurs at least twice, in row order.
pub fn duplicate_ids(records: &RecordSet, field: &str) -> Vec<usize> {
    let Some(column) = records.column(field) else {
        return Vec::new();
    };
    let values: Vec<(usize, &str)> = column
        .filter_map(|(row, value)| value.map(|v| (row, v)))
        .collect();

    let mut occurrences: HashMap<&str, usize> = HashMap::with_capacity(values.len());
    for &(_, value) in &values {
        *occurrences.entry(value).or_default() += 1;
    }

    let duplicates: Vec<usize> = values
        .iter()
        .filter(|(_, value)| occurrences[value] >= 2)
        .map(|(row, _)| *row)
        .collect();

    if !duplicates.is_empty() {
        debug!(
            field,
            rows = duplicates.len(),
            distinct = occurrences.values().filter(|&&n| n >= 2).count(),
            "duplicate identifiers found"
        );
    }
    duplicates
}

pub struct DuplicateIdCheck;

impl Check for DuplicateIdCheck {
    fn name(&self) -> &'static str {
        DUPLICATE_TRANSACTIONS
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::Rows(duplicate_ids(ctx.records, &ctx.config.transaction_field))
    }
}

// =============================================================================
// MALFORMED JSON
// =============================================================================

/// Rows whose non-empty `field` value is not valid JSON.
pub fn malformed_json(records: &RecordSet, field: &str) -> Vec<usize> {
    let Some(column) = records.column(field) else {
        return Vec::new();
    };
    column
        .filter_map(|(row, value)| match value {
            None | Some("") => None,
            Some(text) => serde_json::from_str::<serde_json::Value>(text)
                .is_err()
                .then_some(row),
        })
        .collect()
}

pub struct MalformedJsonCheck;

impl Check for MalformedJsonCheck {
    fn name(&self) -> &'static str {
        MALFORMED_EVENT_PROPERTIES
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::Rows(malformed_json(ctx.records, &ctx.config.properties_field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_column(name: &str, values: &[Option<&str>]) -> RecordSet {
        RecordSet::from_rows(
            vec![name.to_string()],
            values
                .iter()
                .map(|v| vec![v.map(String::from)])
                .collect(),
        )
    }

    #[test]
    fn test_duplicates_report_every_occurrence() {
        let records = single_column(
            "transaction_id",
            &[Some("t1"), Some("t2"), Some("t1"), Some("t3"), Some("t1"), Some("t2")],
        );
        // t1 occurs 3 times, t2 twice: all 5 rows, never N-1.
        assert_eq!(duplicate_ids(&records, "transaction_id"), vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn test_null_identifiers_never_collide() {
        let records = single_column("transaction_id", &[None, None, Some("t1")]);
        assert!(duplicate_ids(&records, "transaction_id").is_empty());
    }

    #[test]
    fn test_duplicates_absent_field_is_empty() {
        let records = single_column("user_id", &[Some("a"), Some("a")]);
        assert!(duplicate_ids(&records, "transaction_id").is_empty());
    }

    #[test]
    fn test_malformed_json_skips_null_and_empty() {
        let records = single_column(
            "event_properties",
            &[
                Some(r#"{"sku": "A1", "qty": 2}"#),
                None,
                Some(""),
                Some("{sku: A1}"),
                Some("[1, 2, 3]"),
                Some(r#"{"open": true"#),
                Some("42"),
            ],
        );
        assert_eq!(malformed_json(&records, "event_properties"), vec![3, 5]);
    }

    #[test]
    fn test_malformed_json_absent_field_is_empty() {
        let records = single_column("user_id", &[Some("{bad")]);
        assert!(malformed_json(&records, "event_properties").is_empty());
    }
}
