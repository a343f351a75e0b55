//! Revenue validity
//!
//! Every row's revenue value is coerced to a number and lands in at most one of
//! three disjoint buckets:
//!
//! | bucket     | condition                                  |
//! |------------|--------------------------------------------|
//! | `nan`      | null, empty, unparseable, or NaN           |
//! | `negative` | parsed and `< 0`                           |
//! | `zero`     | parsed and `== 0`                          |
//!
//! A value that fails coercion is never compared, so it can't also be negative
//! or zero. When the revenue column is missing entirely the check short-circuits
//! to [`RevenueIssues::MissingField`].

use crate::quality::check::{Check, CheckContext, CheckResult, REVENUE, TYPE_ISSUES};
use crate::quality::records::RecordSet;
use serde::Serialize;

/// Outcome of coercing one revenue value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevenueClass {
    NonNumeric,
    Negative,
    Zero,
    Positive,
}

/// Classify a raw revenue value.
pub fn classify_revenue(raw: Option<&str>) -> RevenueClass {
    match coerce_numeric(raw) {
        None => RevenueClass::NonNumeric,
        Some(v) if v < 0.0 => RevenueClass::Negative,
        Some(v) if v == 0.0 => RevenueClass::Zero,
        Some(_) => RevenueClass::Positive,
    }
}

/// Numeric coercion of a raw value; NaN counts as a failure.
pub fn coerce_numeric(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Per-row revenue defects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevenueIssues {
    /// The revenue column does not exist; no rows were examined.
    MissingField,
    Checked {
        nan: Vec<usize>,
        negative: Vec<usize>,
        zero: Vec<usize>,
    },
}

impl RevenueIssues {
    pub fn nan(&self) -> &[usize] {
        match self {
            RevenueIssues::Checked { nan, .. } => nan,
            RevenueIssues::MissingField => &[],
        }
    }

    pub fn negative(&self) -> &[usize] {
        match self {
            RevenueIssues::Checked { negative, .. } => negative,
            RevenueIssues::MissingField => &[],
        }
    }

    pub fn zero(&self) -> &[usize] {
        match self {
            RevenueIssues::Checked { zero, .. } => zero,
            RevenueIssues::MissingField => &[],
        }
    }
}

pub fn revenue_issues(records: &RecordSet, field: &str) -> RevenueIssues {
    let Some(column) = records.column(field) else {
        return RevenueIssues::MissingField;
    };

    let mut nan = Vec::new();
    let mut negative = Vec::new();
    let mut zero = Vec::new();
    for (row, value) in column {
        match classify_revenue(value) {
            RevenueClass::NonNumeric => nan.push(row),
            RevenueClass::Negative => negative.push(row),
            RevenueClass::Zero => zero.push(row),
            RevenueClass::Positive => {}
        }
    }
    RevenueIssues::Checked {
        nan,
        negative,
        zero,
    }
}

pub struct RevenueCheck;

impl Check for RevenueCheck {
    fn name(&self) -> &'static str {
        REVENUE
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::Revenue(revenue_issues(ctx.records, &ctx.config.revenue_field))
    }
}

// =============================================================================
// TYPE ISSUES
// =============================================================================

/// A column that could not be cast as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeIssue {
    pub check: String,
    pub message: String,
}

/// Whole-column cast of the revenue field. Nulls are allowed; the first
/// non-null value that is not a number produces a single issue.
pub fn value_type_issues(records: &RecordSet, field: &str) -> Vec<TypeIssue> {
    let Some(mut column) = records.column(field) else {
        return Vec::new();
    };
    column
        .find_map(|(row, value)| {
            let text = value?;
            text.trim().parse::<f64>().is_err().then(|| TypeIssue {
                check: "value_parse_error".to_string(),
                message: format!("Unable to parse string \"{}\" at position {}", text, row),
            })
        })
        .into_iter()
        .collect()
}

pub struct ValueTypeCheck;

impl Check for ValueTypeCheck {
    fn name(&self) -> &'static str {
        TYPE_ISSUES
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::TypeIssues(value_type_issues(ctx.records, &ctx.config.revenue_field))
    }
}
