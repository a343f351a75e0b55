//! Structural checks: required columns and per-column null accounting.

use crate::quality::check::{Check, CheckContext, CheckResult, NULL_COUNTS, REQUIRED_FIELDS};
use crate::quality::records::{RecordSet, Schema};
use std::collections::BTreeMap;

/// Null count per field; `None` means the field is not in the schema at all.
pub type NullCounts = BTreeMap<String, Option<usize>>;

/// Members of `required` absent from the schema, in the order given.
///
/// Looks at the schema only: an empty batch with every column declared passes.
pub fn required_fields(schema: &Schema, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|field| !schema.contains(field))
        .cloned()
        .collect()
}

/// Null values of `field`, or `None` when the field is absent.
pub fn null_count(records: &RecordSet, field: &str) -> Option<usize> {
    records
        .column(field)
        .map(|column| column.filter(|(_, value)| value.is_none()).count())
}

pub fn null_counts(records: &RecordSet, fields: &[String]) -> NullCounts {
    fields
        .iter()
        .map(|field| (field.clone(), null_count(records, field)))
        .collect()
}

pub struct RequiredFieldsCheck;

impl Check for RequiredFieldsCheck {
    fn name(&self) -> &'static str {
        REQUIRED_FIELDS
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::MissingFields(required_fields(
            ctx.records.schema(),
            &ctx.config.required_columns(),
        ))
    }
}

pub struct NullCountsCheck;

impl Check for NullCountsCheck {
    fn name(&self) -> &'static str {
        NULL_COUNTS
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::NullCounts(null_counts(ctx.records, &ctx.config.null_count_fields))
    }
}
