//! Core type definitions for the resolution engine.
//!
//! These types carry a canonical identity, its linked observations, the
//! temporal groupings of those observations, and the derived evidence and
//! confidence structures downstream consumers read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crosstrace_tables::FieldValue;

// ── Identifier Types ────────────────────────────────────────────────────

/// Canonical identity id. Opaque, source-provided, unique per registry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub String);

impl IdentityId {
    /// Wrap a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Identity ────────────────────────────────────────────────────────────

/// A canonical identity record from the registry.
///
/// Created once per registry row at load time, immutable thereafter,
/// never deleted during a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Canonical id.
    pub id: IdentityId,
    /// Display name.
    pub name: String,
    /// Role attribute from the registry.
    pub role: String,
    /// Email attribute from the registry.
    pub email: String,
    /// Department attribute from the registry.
    pub department: String,
    /// All raw identifier strings claimed by this identity, in
    /// registration order.
    pub identifiers: Vec<String>,
    /// How this identity entered the registry. Registry-sourced
    /// identities are always direct mappings.
    pub resolution_method: String,
}

// ── Provenance ──────────────────────────────────────────────────────────

/// How a derived structure came to exist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Provenance {
    /// An identifier field matched the index directly.
    DirectMatch { field: String },
    /// Derived from a multi-source temporal cluster.
    InferredTemporalPattern,
    /// Derived from evidence-type diversity during fusion.
    MultiModalFusion,
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> String {
        p.to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "inferred_temporal_pattern" => Ok(Self::InferredTemporalPattern),
            "multi_modal_fusion" => Ok(Self::MultiModalFusion),
            other => {
                let field = other
                    .strip_prefix("direct_")
                    .and_then(|rest| rest.strip_suffix("_match"))
                    .ok_or_else(|| format!("unrecognized provenance tag: {other}"))?;
                Ok(Self::DirectMatch {
                    field: field.to_string(),
                })
            }
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectMatch { field } => write!(f, "direct_{field}_match"),
            Self::InferredTemporalPattern => write!(f, "inferred_temporal_pattern"),
            Self::MultiModalFusion => write!(f, "multi_modal_fusion"),
        }
    }
}

// ── Activity Record ─────────────────────────────────────────────────────

/// One normalized, identity-linked observation from a source.
///
/// Appended during linking, never mutated or removed afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// The identity this observation was linked to.
    pub identity_id: IdentityId,
    /// Activity-type tag naming the source semantics.
    pub activity_type: String,
    /// Dataset key the record came from.
    pub source_name: String,
    /// The original record as a field/value map.
    pub raw_fields: BTreeMap<String, FieldValue>,
    /// Event time, absent when the source field was missing or
    /// unparseable.
    pub timestamp: Option<DateTime<Utc>>,
    /// Derived location, absent when no location candidate field was
    /// present.
    pub location: Option<String>,
    /// Fixed 1.0 for direct matches.
    pub confidence: f64,
    /// Which identifier field matched.
    pub provenance: Provenance,
}

// ── Temporal Cluster ────────────────────────────────────────────────────

/// A seed-anchored group of one identity's timestamped activities.
///
/// Members are ordered by timestamp ascending; the cluster is anchored to
/// its first (seed) member's timestamp. Transient — consumed by fusion,
/// not part of the output schema.
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalCluster {
    /// Member activities, timestamp ascending.
    pub members: Vec<ActivityRecord>,
}

impl TemporalCluster {
    /// The seed (first) member's timestamp.
    ///
    /// Every member of a produced cluster carries a timestamp, so this is
    /// only `None` for an empty cluster.
    pub fn seed_timestamp(&self) -> Option<DateTime<Utc>> {
        self.members.first().and_then(|m| m.timestamp)
    }

    /// Distinct source names among members, sorted.
    pub fn distinct_sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self
            .members
            .iter()
            .map(|m| m.source_name.clone())
            .collect();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Number of member activities.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the cluster has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ── Evidence Link ───────────────────────────────────────────────────────

/// Derived corroboration that ≥2 sources observed the same identity
/// within one temporal cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLink {
    /// The corroborated identity.
    pub identity_id: IdentityId,
    /// Distinct sources contributing members, sorted.
    pub sources: Vec<String>,
    /// The cluster's member activities.
    pub member_activities: Vec<ActivityRecord>,
    /// The cluster seed timestamp.
    pub anchor_timestamp: DateTime<Utc>,
    /// Derived confidence, within [0.7, 0.9].
    pub confidence: f64,
    /// Always `inferred_temporal_pattern`.
    pub provenance: Provenance,
    /// Human-readable restatement of source count and window size.
    pub description: String,
}

// ── Confidence Score ────────────────────────────────────────────────────

/// Counts backing a per-identity confidence score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBreakdown {
    /// Distinct evidence types observed (activity types plus the
    /// synthetic cross-source type).
    pub source_type_count: usize,
    /// Total linked activities.
    pub activity_count: usize,
    /// Cross-source evidence links.
    pub cross_link_count: usize,
}

/// Per-identity fused confidence. Exactly one per identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    /// Fused confidence, within [0.0, 0.95].
    pub final_confidence: f64,
    /// Counts the score was derived from.
    pub evidence_breakdown: EvidenceBreakdown,
    /// Always `multi_modal_fusion`.
    pub provenance: Provenance,
}

// ── Configuration ───────────────────────────────────────────────────────

/// Resolution policy knobs.
///
/// A single configurable policy object; the defaults carry the engine's
/// published numbers.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolverConfig {
    /// Temporal cluster window, in minutes, measured against each
    /// cluster's seed member.
    pub cluster_window_minutes: i64,
    /// Minimum member activities for a cluster to yield an evidence link.
    pub min_cluster_members: usize,
    /// Minimum distinct sources for a cluster to yield an evidence link.
    pub min_cluster_sources: usize,
    /// Base confidence before diversity bonuses.
    pub base_confidence: f64,
    /// Confidence added per distinct source / evidence type.
    pub confidence_step: f64,
    /// Upper bound on evidence-link confidence.
    pub link_confidence_cap: f64,
    /// Upper bound on per-identity confidence.
    pub identity_confidence_cap: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cluster_window_minutes: 30,
            min_cluster_members: 2,
            min_cluster_sources: 2,
            base_confidence: 0.7,
            confidence_step: 0.05,
            link_confidence_cap: 0.9,
            identity_confidence_cap: 0.95,
        }
    }
}

/// Tag recorded on registry-sourced identities.
pub const DIRECT_MAPPING: &str = "direct_mapping";
