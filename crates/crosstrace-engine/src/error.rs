//! Error types for the resolution engine.
//!
//! Only one condition is fatal: the identity registry table being absent.
//! Every other condition in the pipeline (skipped sources, unlinked
//! records, unparseable timestamps) is absorbed into diagnostic counts.

use std::fmt;

use crosstrace_tables::TableError;

/// Errors that can occur during identity resolution.
//
// `Display`, `Error`, and `From` are implemented by hand rather than via
// `#[derive(thiserror::Error)]` because thiserror unconditionally treats a
// field named `source` as the error source, and the spec fixes this
// variant's field names as `{ source, column }`.
#[derive(Debug)]
pub enum ResolveError {
    /// The identity registry table is absent from the input. Fatal —
    /// without it no resolution is possible.
    MissingProfileTable,

    /// A source's declared identifier column is missing. The pipeline
    /// itself skips such sources; this variant exists for boundary
    /// callers that validate inputs up front.
    MissingIdentifierColumn { source: String, column: String },

    /// A declared source table is present but empty.
    EmptySource(String),

    /// Error from the tabular input layer.
    Table(TableError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingProfileTable => {
                write!(f, "identity registry table not found in input datasets")
            }
            Self::MissingIdentifierColumn { source, column } => {
                write!(f, "identifier column missing: {column} in source {source}")
            }
            Self::EmptySource(source) => write!(f, "source has no records: {source}"),
            Self::Table(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Table(err) => err.source(),
            _ => None,
        }
    }
}

impl From<TableError> for ResolveError {
    fn from(err: TableError) -> Self {
        Self::Table(err)
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
