//! Error types for the tabular input contract.

use thiserror::Error;

/// Errors raised by loaders and boundary validation over tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// A required column is absent from a table.
    #[error("column missing: {column} in table {table}")]
    ColumnMissing { table: String, column: String },

    /// A table exists but holds no rows.
    #[error("table is empty: {0}")]
    EmptyTable(String),
}

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;
