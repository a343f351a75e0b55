//! Timestamp Normalization
//!
//! Event exports mix several timestamp spellings in the same column. This module
//! turns each raw value into a single canonical instant (`DateTime<FixedOffset>`)
//! or `None`, and precomputes those instants once per batch in a
//! [`TimestampCache`] that every time-aware check reads.
//!
//! # Parse order
//!
//! 1. `2024-01-05T10:00:00.123Z`  (fractional seconds, `Z`)
//! 2. `2024-01-05 10:00:00`       (space separated, no zone)
//! 3. `2024-01-05T10:00:00Z`      (no fraction, `Z`)
//! 4. `2024-01-05T10:00:00+0200`  (numeric offset)
//!
//! The first explicit pattern that matches the whole value wins. Anything else
//! goes through a flexible fallback: RFC 3339, RFC 2822, loose ISO variants,
//! slashed dates, month names (`Jan 5 2024`, `5 March 2024 10:00`) and compact
//! digits (`20240105`, `20240105T101500`). Values without a zone are read as
//! UTC; values with a zone keep their offset.

use crate::quality::records::RecordSet;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Canonical instant produced by the normalizer.
pub type Timestamp = DateTime<FixedOffset>;

/// Explicit patterns, tried in order. `true` means the pattern carries an offset.
const EXPLICIT_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%dT%H:%M:%S%.fZ", false),
    ("%Y-%m-%d %H:%M:%S", false),
    ("%Y-%m-%dT%H:%M:%SZ", false),
    ("%Y-%m-%dT%H:%M:%S%z", true),
];

/// Loose date-time patterns with an offset (fallback only).
const FALLBACK_ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

/// Loose date-time patterns without an offset (fallback only).
const FALLBACK_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    // %B also accepts the three-letter abbreviation when parsing
    "%B %d %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%d %B %Y %H:%M:%S",
    "%B %d %Y %H:%M",
    "%B %d, %Y %H:%M",
    "%d %B %Y %H:%M",
    "%d-%B-%Y %H:%M:%S",
];

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%d-%B-%Y",
];

// =============================================================================
// NORMALIZER
// =============================================================================

/// Parse a raw, nullable timestamp string into a canonical instant.
///
/// Returns `None` for null/blank input or when no pattern and no fallback
/// parser accepts the value.
pub fn parse_timestamp(raw: Option<&str>) -> Option<Timestamp> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }

    for (format, zoned) in EXPLICIT_FORMATS {
        let parsed = if *zoned {
            DateTime::parse_from_str(value, format).ok()
        } else {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(naive_as_utc)
        };
        if parsed.is_some() {
            return parsed;
        }
    }

    parse_flexible(value)
}

/// Fallback for values none of the explicit patterns matched.
fn parse_flexible(value: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Some(ts);
    }
    if let Some(ts) = FALLBACK_ZONED_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(ts);
    }
    if let Some(naive) = FALLBACK_NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Some(naive_as_utc(naive));
    }
    if let Some(naive) = FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN))
    {
        return Some(naive_as_utc(naive));
    }
    parse_compact(value).map(naive_as_utc)
}

/// `YYYYMMDD`, optionally followed by `THHMMSS`.
fn parse_compact(value: &str) -> Option<NaiveDateTime> {
    fn digits(s: &str, len: usize) -> bool {
        s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
    }
    fn field(s: &str, range: std::ops::Range<usize>) -> Option<u32> {
        s.get(range)?.parse().ok()
    }

    let (date, time) = value.split_once('T').unwrap_or((value, ""));
    if !digits(date, 8) {
        return None;
    }
    let year = i32::try_from(field(date, 0..4)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(date, 4..6)?, field(date, 6..8)?)?;
    let time = match time {
        "" => NaiveTime::MIN,
        t if digits(t, 6) => {
            NaiveTime::from_hms_opt(field(t, 0..2)?, field(t, 2..4)?, field(t, 4..6)?)?
        }
        _ => return None,
    };
    Some(date.and_time(time))
}

fn naive_as_utc(naive: NaiveDateTime) -> Timestamp {
    Utc.from_utc_datetime(&naive).into()
}

/// Start of the UTC calendar day containing `ts`; the daily bucket key.
pub fn day_bucket(ts: &Timestamp) -> DateTime<Utc> {
    let date = ts.with_timezone(&Utc).date_naive();
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

// =============================================================================
// TIMESTAMP CACHE
// =============================================================================

/// Parsed timestamps for one or more fields, indexed by row.
///
/// Built once before any check runs and never recomputed; checks only read it.
#[derive(Debug, Clone, Default)]
pub struct TimestampCache {
    fields: HashMap<String, Vec<Option<Timestamp>>>,
}

impl TimestampCache {
    /// Parse every row of each requested field. Fields missing from the schema
    /// are skipped, so `get` later returns `None` for them.
    pub fn build<'a>(records: &RecordSet, fields: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cache = Self::default();
        for field in fields {
            if cache.fields.contains_key(field) {
                continue;
            }
            let Some(position) = records.schema().position(field) else {
                debug!(field, "timestamp field not in schema, nothing cached");
                continue;
            };

            let parsed: Vec<Option<Timestamp>> = records
                .records()
                .par_iter()
                .map(|record| parse_timestamp(record.value_at(position)))
                .collect();

            let failures = parsed.iter().filter(|ts| ts.is_none()).count();
            debug!(
                field,
                rows = parsed.len(),
                failures,
                "timestamp cache built"
            );
            cache.fields.insert(field.to_string(), parsed);
        }
        cache
    }

    /// Parsed values for `field`, one per row, or `None` if the field was not cached.
    pub fn get(&self, field: &str) -> Option<&[Option<Timestamp>]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Parsed value of `field` at `row`.
    pub fn at(&self, field: &str, row: usize) -> Option<Timestamp> {
        self.get(field)?.get(row).copied().flatten()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn utc(raw: &str) -> DateTime<Utc> {
        parse_timestamp(Some(raw))
            .unwrap_or_else(|| panic!("expected {raw} to parse"))
            .with_timezone(&Utc)
    }

    #[test]
    fn test_iso_with_fraction_and_z() {
        let ts = utc("2024-03-01T12:30:45.250Z");
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (12, 30, 45));
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_space_separated_is_utc() {
        let ts = parse_timestamp(Some("2024-03-01 08:00:00")).unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn test_iso_z_without_fraction() {
        let ts = utc("2024-03-01T23:59:59Z");
        assert_eq!(ts.day(), 1);
        assert_eq!(ts.second(), 59);
    }

    #[test]
    fn test_numeric_offset_is_preserved() {
        let ts = parse_timestamp(Some("2024-03-01T10:00:00+0530")).unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(ts.with_timezone(&Utc).hour(), 4);
        assert_eq!(ts.with_timezone(&Utc).minute(), 30);
    }

    #[test]
    fn test_fallback_formats() {
        assert_eq!(utc("2024-03-01T10:00:00.5+01:00").hour(), 9);
        assert_eq!(utc("Fri, 01 Mar 2024 10:00:00 +0000").hour(), 10);
        assert_eq!(utc("2024-03-01").hour(), 0);
        assert_eq!(utc("2024/03/01 07:15:00").minute(), 15);
        assert_eq!(utc("2024-03-01 07:15").minute(), 15);
    }

    #[test]
    fn test_fallback_month_names() {
        let ts = utc("Jan 5 2024");
        assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour()), (2024, 1, 5, 0));
        assert_eq!(utc("January 5, 2024").day(), 5);
        assert_eq!(utc("5 Mar 2024").month(), 3);
        assert_eq!(utc("05-Mar-2024").day(), 5);
        assert_eq!(utc("Mar 5 2024 14:30:00").hour(), 14);
        assert_eq!(utc("5 March 2024 09:45").minute(), 45);
    }

    #[test]
    fn test_fallback_compact_digits() {
        let ts = utc("20240105");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 1, 5));
        let ts = utc("20240105T101530");
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (10, 15, 30));
        assert!(parse_timestamp(Some("20241305")).is_none());
        assert!(parse_timestamp(Some("2024010")).is_none());
        assert!(parse_timestamp(Some("20240105T1015")).is_none());
    }

    #[test]
    fn test_unparseable_and_null() {
        assert!(parse_timestamp(None).is_none());
        assert!(parse_timestamp(Some("")).is_none());
        assert!(parse_timestamp(Some("   ")).is_none());
        assert!(parse_timestamp(Some("not a date")).is_none());
        assert!(parse_timestamp(Some("2024-13-45T99:00:00Z")).is_none());
    }

    #[test]
    fn test_day_bucket_uses_utc_day() {
        let late_evening = parse_timestamp(Some("2024-01-01T23:30:00-0200")).unwrap();
        assert_eq!(day_bucket(&late_evening), utc("2024-01-02T00:00:00Z"));

        let morning = parse_timestamp(Some("2024-01-01 06:00:00")).unwrap();
        assert_eq!(day_bucket(&morning), utc("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_cache_indexes_by_row_and_skips_unknown_fields() {
        let records = RecordSet::from_rows(
            vec!["event_timestamp".into(), "event_name".into()],
            vec![
                vec![Some("2024-01-01 00:00:00".into()), Some("view".into())],
                vec![Some("garbage".into()), Some("view".into())],
                vec![None, Some("view".into())],
            ],
        );
        let cache =
            TimestampCache::build(&records, ["event_timestamp", "missing", "event_timestamp"]);

        assert!(cache.contains("event_timestamp"));
        assert!(!cache.contains("missing"));
        assert!(cache.get("missing").is_none());

        let parsed = cache.get("event_timestamp").unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(cache.at("event_timestamp", 0).is_some());
        assert!(cache.at("event_timestamp", 1).is_none());
        assert!(cache.at("event_timestamp", 2).is_none());
        assert!(cache.at("event_timestamp", 99).is_none());
    }
}
