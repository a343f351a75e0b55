//! Batch Ingestion
//!
//! Loads a CSV or newline-delimited JSON export into a [`RecordSet`]. Every
//! value stays a raw nullable string; no types are inferred here.
//!
//! # Nulls
//!
//! - CSV: a cell equal to one of the standard NA markers ([`NA_VALUES`]) is
//!   null. Short rows are padded with nulls.
//! - JSONL: JSON `null` and missing keys are null. Strings are kept verbatim;
//!   numbers, booleans, arrays and objects are kept as compact JSON text.

use crate::quality::records::RecordSet;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Cell values read as null in CSV input.
pub const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_na(value: &str) -> bool {
    NA_VALUES.contains(&value)
}

// =============================================================================
// FORMAT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    #[default]
    Csv,
    Jsonl,
}

impl FromStr for InputFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(InputFormat::Csv),
            "jsonl" | "ndjson" => Ok(InputFormat::Jsonl),
            other => Err(IngestError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Csv => write!(f, "csv"),
            InputFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub enum IngestError {
    Io(std::io::Error),
    Csv(csv::Error),
    /// Line `line` (1-based) is not valid JSON.
    Json {
        line: usize,
        source: serde_json::Error,
    },
    /// Line `line` (1-based) is valid JSON but not an object.
    NotAnObject { line: usize },
    /// No header row (CSV) or no objects (JSONL).
    EmptySource,
    UnsupportedFormat(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {}", e),
            Self::Csv(e) => write!(f, "csv error: {}", e),
            Self::Json { line, source } => write!(f, "invalid json on line {}: {}", line, source),
            Self::NotAnObject { line } => write!(f, "line {} is not a json object", line),
            Self::EmptySource => write!(f, "no columns to parse from input"),
            Self::UnsupportedFormat(name) => {
                write!(f, "unsupported input format: {} (expected csv or jsonl)", name)
            }
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Json { source, .. } => Some(source),
            Self::NotAnObject { .. } | Self::EmptySource | Self::UnsupportedFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

// =============================================================================
// LOADING
// =============================================================================

/// Load the whole file at `path`.
pub fn load_records(
    path: impl AsRef<Path>,
    format: InputFormat,
) -> Result<RecordSet, IngestError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let records = match format {
        InputFormat::Csv => read_csv(BufReader::new(file))?,
        InputFormat::Jsonl => read_jsonl(BufReader::new(file))?,
    };
    info!(
        path = %path.display(),
        %format,
        rows = records.len(),
        columns = records.schema().len(),
        "batch loaded"
    );
    Ok(records)
}

/// Read CSV with a header row. Input without one is an error.
pub fn read_csv<R: Read>(reader: R) -> Result<RecordSet, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if columns.is_empty() {
        return Err(IngestError::EmptySource);
    }
    let mut records = RecordSet::new(columns);
    let mut ragged = 0usize;
    for row in reader.records() {
        let row = row?;
        if row.len() != records.schema().len() {
            ragged += 1;
        }
        records.push(
            row.iter()
                .map(|cell| (!is_na(cell)).then(|| cell.to_string()))
                .collect(),
        );
    }
    if ragged > 0 {
        debug!(ragged, "csv rows with a different field count than the header");
    }
    Ok(records)
}

/// Read one JSON object per line. Blank lines are skipped. The schema is the
/// union of all keys, in the order they are first seen. Input with no objects
/// is an error.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<RecordSet, IngestError> {
    let mut columns: Vec<String> = Vec::new();
    let mut known: HashSet<String> = HashSet::new();
    let mut objects = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let number = index + 1;
        let value: Value = serde_json::from_str(text).map_err(|source| IngestError::Json {
            line: number,
            source,
        })?;
        let Value::Object(object) = value else {
            return Err(IngestError::NotAnObject { line: number });
        };
        for key in object.keys() {
            if known.insert(key.clone()) {
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }
    if objects.is_empty() {
        return Err(IngestError::EmptySource);
    }

    let rows = objects
        .into_iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get(column).and_then(json_cell))
                .collect()
        })
        .collect();
    Ok(RecordSet::from_rows(columns, rows))
}

fn json_cell(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<InputFormat>().unwrap(), InputFormat::Csv);
        assert_eq!("JSONL".parse::<InputFormat>().unwrap(), InputFormat::Jsonl);
        assert!(matches!(
            "parquet".parse::<InputFormat>(),
            Err(IngestError::UnsupportedFormat(name)) if name == "parquet"
        ));
        assert_eq!(InputFormat::Jsonl.to_string(), "jsonl");
    }

    #[test]
    fn test_csv_keeps_raw_strings_and_marks_na() {
        let data = "event_name,value,user_id\n\
                    purchase,007.50,u1\n\
                    view,NA,\n\
                    view,n/a,null\n";
        let records = read_csv(Cursor::new(data)).unwrap();
        assert_eq!(records.schema().columns(), &["event_name", "value", "user_id"]);
        assert_eq!(records.len(), 3);

        let first = records.get(0).unwrap();
        assert_eq!(first.get("value"), Some("007.50"));

        let second = records.get(1).unwrap();
        assert_eq!(second.get("value"), None);
        assert_eq!(second.get("user_id"), None);
        assert_eq!(records.get(2).unwrap().get("user_id"), None);
    }

    #[test]
    fn test_csv_quoted_json_and_short_rows() {
        let data = "event_name,event_properties,user_id\n\
                    view,\"{\"\"sku\"\": \"\"A1\"\"}\",u1\n\
                    view\n";
        let records = read_csv(Cursor::new(data)).unwrap();
        assert_eq!(records.get(0).unwrap().get("event_properties"), Some(r#"{"sku": "A1"}"#));
        let short = records.get(1).unwrap();
        assert_eq!(short.get("event_name"), Some("view"));
        assert_eq!(short.get("user_id"), None);
    }

    #[test]
    fn test_csv_header_only_is_empty_with_schema() {
        let records = read_csv(Cursor::new("event_name,event_timestamp\n")).unwrap();
        assert!(records.is_empty());
        assert!(records.schema().contains("event_timestamp"));
    }

    #[test]
    fn test_csv_without_header_is_rejected() {
        assert!(matches!(read_csv(Cursor::new("")), Err(IngestError::EmptySource)));
    }

    #[test]
    fn test_jsonl_without_objects_is_rejected() {
        assert!(matches!(read_jsonl(Cursor::new("")), Err(IngestError::EmptySource)));
        assert!(matches!(read_jsonl(Cursor::new("\n  \n")), Err(IngestError::EmptySource)));
    }

    #[test]
    fn test_jsonl_keeps_key_order() {
        let records = read_jsonl(Cursor::new("{\"zeta\": 1, \"alpha\": 2}\n")).unwrap();
        assert_eq!(records.schema().columns(), &["zeta", "alpha"]);
    }

    #[test]
    fn test_jsonl_union_schema_and_raw_values() {
        let data = r#"{"event_name": "view", "user_id": "u1"}

{"event_name": "purchase", "value": 12.5, "user_id": null, "event_properties": {"sku": "A1"}}
"#;
        let records = read_jsonl(Cursor::new(data)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.schema().len(), 4);

        let first = records.get(0).unwrap();
        assert_eq!(first.get("value"), None);
        assert_eq!(first.get("user_id"), Some("u1"));

        let second = records.get(1).unwrap();
        assert_eq!(second.get("value"), Some("12.5"));
        assert_eq!(second.get("user_id"), None);
        assert_eq!(second.get("event_properties"), Some(r#"{"sku":"A1"}"#));
    }

    #[test]
    fn test_jsonl_errors_name_the_line() {
        let bad = "{\"a\": 1}\n{not json}\n";
        assert!(matches!(
            read_jsonl(Cursor::new(bad)),
            Err(IngestError::Json { line: 2, .. })
        ));

        let array = "{\"a\": 1}\n\n[1, 2]\n";
        assert!(matches!(
            read_jsonl(Cursor::new(array)),
            Err(IngestError::NotAnObject { line: 3 })
        ));
    }

    #[test]
    fn test_load_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        std::fs::write(&path, "event_name,event_timestamp\nview,2024-01-01 00:00:00\n").unwrap();

        let records = load_records(&path, InputFormat::Csv).unwrap();
        assert_eq!(records.len(), 1);

        let missing = load_records(dir.path().join("missing.csv"), InputFormat::Csv);
        assert!(matches!(missing, Err(IngestError::Io(_))));
    }
}
