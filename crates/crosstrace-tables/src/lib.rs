//! # crosstrace-tables
//!
//! Tabular input contract for the crosstrace resolution engine.
//!
//! Everything the engine consumes is materialized here first: loosely typed
//! tables of field-bag records keyed by source name, the catalog of
//! recognized observation sources with their declared record layouts, and
//! lenient timestamp parsing. No resolution logic lives in this crate.
//!
//! ```text
//!   ┌──────────────┐     ┌───────────────┐     ┌──────────────────┐
//!   │ external     │────▶│  DatasetMap   │────▶│ crosstrace-engine │
//!   │ loader (CSV, │     │  Table        │     │ (registry, linker,│
//!   │ DB, ...)     │     │  Record       │     │  cluster, fusion) │
//!   └──────────────┘     │  FieldValue   │     └──────────────────┘
//!                        └───────────────┘
//!                         SourceKind / SourceSchema declare, per source,
//!                         the identifier field, timestamp field, and
//!                         location candidates — resolved once, not per row.
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod source;
pub mod table;
pub mod timestamp;
pub mod value;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use error::{TableError, TableResult};
pub use source::{SourceKind, SourceSchema, IDENTIFIER_FIELDS, LOCATION_FIELDS, PROFILE_KEY};
pub use table::{DatasetMap, Record, Table};
pub use timestamp::{parse_timestamp, parse_timestamp_str};
pub use value::FieldValue;
