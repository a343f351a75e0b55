//! Record Set
//!
//! In-memory, ordered table of raw event records. Every value is kept as the
//! nullable string it was ingested as; typed coercion happens inside the check
//! that needs it. Row indices are assigned at insertion (`0..len`) and never
//! change, so every check can report rows by the same identity.

use std::collections::HashMap;
use std::sync::Arc;

/// Ordered column names with O(1) name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema. A repeated column name resolves to its first position.
    pub fn new(columns: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (position, name) in columns.iter().enumerate() {
            index.entry(name.clone()).or_insert(position);
        }
        Self { columns, index }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One raw event row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    row: usize,
    schema: Arc<Schema>,
    values: Vec<Option<String>>,
}

impl EventRecord {
    /// Stable row index within the owning [`RecordSet`].
    pub fn row(&self) -> usize {
        self.row
    }

    /// Raw value of `field`; `None` when the value is null or the field is unknown.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.schema
            .position(field)
            .and_then(|position| self.value_at(position))
    }

    /// Raw value at a schema position.
    pub fn value_at(&self, position: usize) -> Option<&str> {
        self.values.get(position).and_then(|v| v.as_deref())
    }

    /// All values in schema order.
    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }
}

/// Ordered collection of [`EventRecord`]s sharing one schema.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    schema: Arc<Schema>,
    records: Vec<EventRecord>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            schema: Arc::new(Schema::new(columns)),
            records: Vec::new(),
        }
    }

    /// Convenience constructor used by ingestion and tests.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let mut set = Self::new(columns);
        set.records.reserve(rows.len());
        for row in rows {
            set.push(row);
        }
        set
    }

    /// Append a row and return its index. Short rows are padded with nulls,
    /// long rows are cut to the schema width.
    pub fn push(&mut self, mut values: Vec<Option<String>>) -> usize {
        values.resize(self.schema.len(), None);
        let row = self.records.len();
        self.records.push(EventRecord {
            row,
            schema: Arc::clone(&self.schema),
            values,
        });
        row
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EventRecord> {
        self.records.iter()
    }

    pub fn get(&self, row: usize) -> Option<&EventRecord> {
        self.records.get(row)
    }

    /// `(row, value)` for every record, or `None` if `field` is not in the schema.
    pub fn column<'a>(
        &'a self,
        field: &str,
    ) -> Option<impl Iterator<Item = (usize, Option<&'a str>)> + 'a> {
        let position = self.schema.position(field)?;
        Some(
            self.records
                .iter()
                .map(move |record| (record.row, record.value_at(position))),
        )
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a EventRecord;
    type IntoIter = std::slice::Iter<'a, EventRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
