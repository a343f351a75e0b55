//! Volume Anomaly Detector
//!
//! Counts events per UTC day and flags days whose count sits more than
//! `sigma` sample standard deviations from the mean of all observed days.
//!
//! The mean and deviation are global over the whole batch, so a large spike
//! inflates the very statistics used to judge it. That is a known property of
//! this detector and is kept as is; for `n` buckets a single outlier can reach
//! at most a z-score of `(n - 1) / sqrt(n)`, which bounds what short series can
//! ever flag.
//!
//! Rows without a parsed timestamp are not counted anywhere. Days without data
//! produce no bucket (no zero filling).

use crate::quality::check::{Check, CheckContext, CheckResult, VOLUME};
use crate::quality::timestamp::{day_bucket, Timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::debug;

/// Event count for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Bucket {
    pub period_start: DateTime<Utc>,
    pub count: usize,
}

/// Mean and sample standard deviation of a series. `None` when undefined
/// (no data for the mean, fewer than two points for the deviation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl SeriesStats {
    pub fn of(values: &[f64]) -> Self {
        let finite = |v: f64| v.is_finite().then_some(v);
        Self {
            mean: finite(values.iter().mean()),
            std_dev: finite(values.iter().std_dev()),
        }
    }
}

/// Indices of values further than `sigma` standard deviations from the mean.
pub fn zscore_outliers(values: &[f64], sigma: f64) -> (SeriesStats, Vec<usize>) {
    let stats = SeriesStats::of(values);
    let (Some(mean), Some(std_dev)) = (stats.mean, stats.std_dev) else {
        return (stats, Vec::new());
    };
    let limit = sigma * std_dev;
    let flagged = values
        .iter()
        .enumerate()
        .filter(|(_, v)| (*v - mean).abs() > limit)
        .map(|(i, _)| i)
        .collect();
    (stats, flagged)
}

/// Daily event counts, ordered by day.
pub fn daily_counts<'a>(timestamps: impl IntoIterator<Item = &'a Timestamp>) -> Vec<Bucket> {
    let mut counts: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(day_bucket(ts)).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(period_start, count)| Bucket {
            period_start,
            count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeReport {
    pub by_period: Vec<Bucket>,
    pub anomalies: Vec<Bucket>,
    pub stats: SeriesStats,
    pub sigma: f64,
}

impl VolumeReport {
    /// Absolute deviation a bucket must exceed to be flagged.
    pub fn threshold(&self) -> Option<f64> {
        self.stats.std_dev.map(|std| std * self.sigma)
    }

    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

/// Flag anomalous buckets in an already bucketed series.
pub fn flag_buckets(by_period: Vec<Bucket>, sigma: f64) -> VolumeReport {
    let counts: Vec<f64> = by_period.iter().map(|b| b.count as f64).collect();
    let (stats, flagged) = zscore_outliers(&counts, sigma);
    let anomalies = flagged.into_iter().map(|i| by_period[i]).collect();
    VolumeReport {
        by_period,
        anomalies,
        stats,
        sigma,
    }
}

/// Bucket parsed event times by day and flag anomalous days.
pub fn detect_volume_anomalies(
    event_times: Option<&[Option<Timestamp>]>,
    sigma: f64,
) -> VolumeReport {
    let buckets = daily_counts(event_times.unwrap_or_default().iter().flatten());
    let report = flag_buckets(buckets, sigma);
    debug!(
        buckets = report.by_period.len(),
        anomalies = report.anomalies.len(),
        mean = ?report.stats.mean,
        std_dev = ?report.stats.std_dev,
        "volume series evaluated"
    );
    report
}

pub struct VolumeCheck;

impl Check for VolumeCheck {
    fn name(&self) -> &'static str {
        VOLUME
    }

    fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        CheckResult::Volume(detect_volume_anomalies(
            ctx.event_times(),
            ctx.config.volume_sigma,
        ))
    }
}
