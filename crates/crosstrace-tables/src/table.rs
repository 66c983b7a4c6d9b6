//! In-memory tables and the dataset map the engine consumes.
//!
//! Every observation source (and the identity registry itself) is a
//! [`Table`] of field-bag [`Record`]s keyed by source name in a
//! [`DatasetMap`]. Loaders fill these from whatever storage they read;
//! the engine only ever sees the materialized form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

// ── Record ──────────────────────────────────────────────────────────────

/// One row of a table: an ordered field-name → value map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Builder-style variant of [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Get a field's raw value, if the field exists.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Get a field's canonical text form, if present and non-missing.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(FieldValue::as_text)
    }

    /// Whether the record carries this field at all (even if missing).
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// All fields in sorted-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Clone the record into the raw-details map carried on activity
    /// records.
    pub fn to_raw_fields(&self) -> BTreeMap<String, FieldValue> {
        self.fields.clone()
    }
}

// ── Table ───────────────────────────────────────────────────────────────

/// A named list of records, the materialized form of one data source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Source name this table was loaded from.
    pub name: String,
    rows: Vec<Record>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn push(&mut self, record: Record) {
        self.rows.push(record);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row carries the given column.
    ///
    /// Field-bag rows have no shared header, so a column "exists" when at
    /// least one row mentions it.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.contains_field(column))
    }

    /// Iterate over rows in load order.
    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter()
    }
}

// ── DatasetMap ──────────────────────────────────────────────────────────

/// The engine's entire input: source key → table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetMap {
    tables: BTreeMap<String, Table>,
}

impl DatasetMap {
    /// Create an empty dataset map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table under a source key, replacing any previous table.
    pub fn insert(&mut self, key: impl Into<String>, table: Table) {
        self.tables.insert(key.into(), table);
    }

    /// Look up a table by source key.
    pub fn get(&self, key: &str) -> Option<&Table> {
        self.tables.get(key)
    }

    /// Whether a source key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }

    /// Source keys actually present, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.tables.keys()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the map holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
