//! Typed cell values for tabular observation data.
//!
//! Observation sources arrive as loosely typed tables (CSV-shaped); a cell
//! may hold text, a number, a boolean, or nothing at all. `FieldValue`
//! normalizes those shapes and defines the missing-value and string-coercion
//! semantics the rest of the engine relies on.

use serde::{Deserialize, Serialize};

/// A single cell of an observation record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free-form text.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating-point value. Id columns loaded from CSV sometimes arrive
    /// as floats (`1001.0`); see [`FieldValue::as_text`].
    Float(f64),
    /// Boolean flag.
    Bool(bool),
    /// Absent cell.
    Missing,
}

impl FieldValue {
    /// Whether this cell counts as missing.
    ///
    /// `Missing` is missing; so is text that is empty or whitespace-only
    /// after trimming, matching how blank CSV cells surface upstream.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Canonical string form used for identifier matching.
    ///
    /// Text is trimmed; numbers and booleans render via `Display`. A float
    /// that is a whole number renders without a fractional part so an id
    /// column read as `1001.0` still matches the registry's `"1001"`.
    /// Returns `None` for missing cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    Some(format!("{}", *f as i64))
                } else {
                    Some(f.to_string())
                }
            }
            Self::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}
