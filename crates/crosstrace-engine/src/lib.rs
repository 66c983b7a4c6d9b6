//! # crosstrace-engine
//!
//! Identity Resolution & Temporal Evidence Fusion.
//!
//! This crate resolves a single canonical identity across heterogeneous,
//! weakly-linked observation logs and fuses the per-identity evidence into
//! confidence-scored, time-ordered behavioral records.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────┐
//!   │ DatasetMap           │  (crosstrace-tables: profiles + observation
//!   │ (materialized input) │   source tables)
//!   └──────────┬───────────┘
//!              ▼
//!   ┌──────────────────────┐
//!   │ IdentityRegistry     │  ← every registry identifier → one identity
//!   │ + IdentifierIndex    │    (last-write-wins on collision)
//!   └──────────┬───────────┘
//!              ▼
//!   ┌──────────────────────┐
//!   │ SourceLinker         │  ← ordered matching policy: exact →
//!   │                      │    case-insensitive → suffix-stripped →
//!   └──────────┬───────────┘    containment; unmatched records drop
//!              ▼
//!   ┌──────────────────────┐
//!   │ TemporalClusterer    │  ← seed-anchored 30-minute windows,
//!   │                      │    independent per identity
//!   └──────────┬───────────┘
//!              ▼
//!   ┌──────────────────────┐
//!   │ EvidenceFusion       │  ← ≥2-source clusters → evidence links;
//!   │                      │    diversity → per-identity confidence
//!   └──────────┬───────────┘
//!              ▼
//!   ┌──────────────────────┐
//!   │ Output Assembler     │  → externally consumed report schema
//!   └──────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! - **Deterministic**: one batch pass in fixed stage order; identical
//!   inputs produce identical resolutions. The only wall-clock value is
//!   the assembled report's `generated_at`.
//! - **Absorbing**: only a missing identity registry is fatal. Skipped
//!   sources, unlinkable records, and unparseable timestamps lower counts
//!   instead of raising.
//! - **Diversity-scored**: confidence rewards distinct evidence types,
//!   never raw activity volume.

#![deny(unsafe_code)]

pub mod cluster;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod linker;
pub mod output;
pub mod registry;
pub mod types;

// ── Re-exports ──────────────────────────────────────────────────────────

pub use cluster::TemporalClusterer;
pub use engine::{Resolution, ResolutionEngine};
pub use error::{ResolveError, ResolveResult};
pub use fusion::{EvidenceFusion, CROSS_SOURCE_TYPE};
pub use linker::{
    resolve_identifier, LinkReport, LinkStats, MatchOutcome, MatchStrategy, SourceLinker,
};
pub use output::{
    assemble, ActivityItem, BehavioralSummary, IdentityReport, ResolutionReport, Statistics,
    TimeRange,
};
pub use registry::{IdentifierIndex, IdentityRegistry};
pub use types::{
    ActivityRecord, ConfidenceScore, EvidenceBreakdown, EvidenceLink, Identity, IdentityId,
    Provenance, ResolverConfig, TemporalCluster, DIRECT_MAPPING,
};
