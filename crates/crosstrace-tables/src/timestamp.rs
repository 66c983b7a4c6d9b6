//! Lenient timestamp parsing.
//!
//! Observation logs carry timestamps in whatever shape their exporters
//! produced. Parsing tries a fixed list of formats in order; anything that
//! fails every format is simply absent — downstream temporal logic excludes
//! the record rather than erroring.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::FieldValue;

/// Accepted date-time formats, tried in order after RFC 3339.
const FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a cell as a UTC date-time.
///
/// Naive values are taken as UTC. Bare dates parse to midnight. Returns
/// `None` for missing cells and for values no format accepts.
pub fn parse_timestamp(value: &FieldValue) -> Option<DateTime<Utc>> {
    let text = value.as_text()?;
    parse_timestamp_str(&text)
}

/// String-form variant of [`parse_timestamp`].
pub fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}
