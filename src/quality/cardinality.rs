//! Cardinality Spike Detector
//!
//! Per UTC day, the number of distinct non-null values of one field seen that
//! day only (never cumulative). Each day is compared with the previous observed
//! day and flagged when the percentage growth exceeds the configured cutoff.
//!
//! Percentage change against a zero-distinct day is `+inf` when the current day
//! has values and `0` when it has none. The first day has no reference and its
//! change is exactly `0`.

use crate::quality::check::{Check, CheckContext, CheckResult, USER_CARDINALITY};
use crate::quality::records::RecordSet;
use crate::quality::timestamp::{day_bucket, Timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Distinct-value count for one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardinalityBucket {
    pub period_start: DateTime<Utc>,
    pub unique: usize,
    /// Growth vs. the previous bucket, in percent. Infinite growth serializes
    /// as `null`.
    pub pct_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardinalityReport {
    pub field: String,
    pub time_field: String,
    pub by_period: Vec<CardinalityBucket>,
    pub spikes: Vec<CardinalityBucket>,
    pub growth_pct: f64,
}

impl CardinalityReport {
    fn empty(field: &str, time_field: &str, growth_pct: f64) -> Self {
        Self {
            field: field.to_string(),
            time_field: time_field.to_string(),
            by_period: Vec::new(),
            spikes: Vec::new(),
            growth_pct,
        }
    }

    pub fn has_spikes(&self) -> bool {
        !self.spikes.is_empty()
    }
}

/// Day-over-day percentage change of a series; the first entry is `0`.
pub fn pct_changes(series: &[usize]) -> Vec<f64> {
    let mut changes = Vec::with_capacity(series.len());
    let mut previous: Option<usize> = None;
    for &current in series {
        let change = match previous {
            None => 0.0,
            Some(0) if current == 0 => 0.0,
            Some(0) => f64::INFINITY,
            Some(prev) => (current as f64 - prev as f64) / prev as f64 * 100.0,
        };
        changes.push(change);
        previous = Some(current);
    }
    changes
}

/// Attach changes to a bucketed distinct-count series and flag the spikes.
pub fn flag_growth(
    series: Vec<(DateTime<Utc>, usize)>,
    growth_pct: f64,
) -> (Vec<CardinalityBucket>, Vec<CardinalityBucket>) {
    let counts: Vec<usize> = series.iter().map(|(_, unique)| *unique).collect();
    let by_period: Vec<CardinalityBucket> = series
        .into_iter()
        .zip(pct_changes(&counts))
        .map(|((period_start, unique), pct_change)| CardinalityBucket {
            period_start,
            unique,
            pct_change,
        })
        .collect();
    let spikes = by_period
        .iter()
        .filter(|bucket| bucket.pct_change > growth_pct)
        .copied()
        .collect();
    (by_period, spikes)
}

/// Bucket rows by the parsed `times` (one per row) and flag distinct-count spikes
/// of `field`.
///
/// A day whose rows all have a null `field` still yields a bucket with zero
/// distinct values. Either column missing gives an empty report.
pub fn detect_cardinality_spikes(
    records: &RecordSet,
    times: Option<&[Option<Timestamp>]>,
    field: &str,
    time_field: &str,
    growth_pct: f64,
) -> CardinalityReport {
    let (Some(column), Some(times)) = (records.column(field), times) else {
        debug!(field, time_field, "cardinality inputs missing, nothing to bucket");
        return CardinalityReport::empty(field, time_field, growth_pct);
    };

    let mut days: BTreeMap<DateTime<Utc>, HashSet<&str>> = BTreeMap::new();
    for (row, value) in column {
        let Some(ts) = times.get(row).copied().flatten() else {
            continue;
        };
        let distinct = days.entry(day_bucket(&ts)).or_default();
        if let Some(value) = value {
            distinct.insert(value);
        }
    }

    let series = days
        .into_iter()
        .map(|(day, distinct)| (day, distinct.len()))
        .collect();
    let (by_period, spikes) = flag_growth(series, growth_pct);
    debug!(
        field,
        buckets = by_period.len(),
        spikes = spikes.len(),
        "cardinality series evaluated"
    );

    CardinalityReport {
        field: field.to_string(),
        time_field: time_field.to_string(),
        by_period,
        spikes,
        growth_pct,
    }
}

pub struct CardinalityCheck;

impl Check for CardinalityCheck {
    fn name(&self) -> &'static str {
        USER_CARDINALITY
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        let time_field = ctx.config.cardinality_time_field();
        CheckResult::Cardinality(detect_cardinality_spikes(
            ctx.records,
            ctx.timestamps.get(time_field),
            &ctx.config.cardinality_field,
            time_field,
            ctx.config.cardinality_growth_pct,
        ))
    }
}
