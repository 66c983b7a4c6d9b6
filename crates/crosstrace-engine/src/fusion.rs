//! Evidence fusion: cross-source corroboration links and per-identity
//! confidence.
//!
//! A temporal cluster whose members come from enough distinct sources
//! becomes one cross-source evidence link. Separately, each identity gets
//! exactly one fused confidence score driven by the diversity of evidence
//! types observed — an identity seen once each in five sources scores
//! higher than one seen fifty times in one source.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{
    ActivityRecord, ConfidenceScore, EvidenceBreakdown, EvidenceLink, IdentityId, Provenance,
    ResolverConfig, TemporalCluster,
};

/// Synthetic evidence type counted when an identity has cross-source links.
pub const CROSS_SOURCE_TYPE: &str = "cross_source";

/// Derives evidence links and confidence scores from clustered activities.
#[derive(Clone, Debug)]
pub struct EvidenceFusion {
    config: ResolverConfig,
}

impl EvidenceFusion {
    /// Create a fusion stage with the given policy.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Derive cross-source evidence links from one identity's clusters.
    ///
    /// A cluster qualifies when it has at least `min_cluster_members`
    /// members drawn from at least `min_cluster_sources` distinct sources.
    /// Link confidence is `min(cap, base + step * source_count)`.
    pub fn derive_evidence_links(
        &self,
        identity_id: &IdentityId,
        clusters: &[TemporalCluster],
    ) -> Vec<EvidenceLink> {
        let mut links = Vec::new();
        for cluster in clusters {
            if cluster.len() < self.config.min_cluster_members {
                continue;
            }
            let sources = cluster.distinct_sources();
            if sources.len() < self.config.min_cluster_sources {
                continue;
            }
            let Some(anchor) = cluster.seed_timestamp() else {
                continue;
            };

            let confidence = self.link_confidence(sources.len());
            debug!(
                identity = %identity_id,
                sources = sources.len(),
                members = cluster.len(),
                confidence,
                "cross-source evidence link"
            );
            links.push(EvidenceLink {
                identity_id: identity_id.clone(),
                description: format!(
                    "activities from {} sources within {} minutes",
                    sources.len(),
                    self.config.cluster_window_minutes
                ),
                sources,
                member_activities: cluster.members.clone(),
                anchor_timestamp: anchor,
                confidence,
                provenance: Provenance::InferredTemporalPattern,
            });
        }
        links
    }

    /// Compute one identity's fused confidence score.
    ///
    /// Evidence types are the distinct activity-type tags present, plus
    /// the synthetic cross-source type when the identity has at least one
    /// evidence link. No evidence types at all scores 0.0.
    pub fn score_identity(
        &self,
        activities: &[ActivityRecord],
        links: &[EvidenceLink],
    ) -> ConfidenceScore {
        let mut evidence_types: Vec<&str> =
            activities.iter().map(|a| a.activity_type.as_str()).collect();
        evidence_types.sort();
        evidence_types.dedup();
        if !links.is_empty() {
            evidence_types.push(CROSS_SOURCE_TYPE);
        }

        let final_confidence = if evidence_types.is_empty() {
            0.0
        } else {
            let raw = self.config.base_confidence
                + self.config.confidence_step * evidence_types.len() as f64;
            raw.min(self.config.identity_confidence_cap)
        };

        ConfidenceScore {
            final_confidence,
            evidence_breakdown: EvidenceBreakdown {
                source_type_count: evidence_types.len(),
                activity_count: activities.len(),
                cross_link_count: links.len(),
            },
            provenance: Provenance::MultiModalFusion,
        }
    }

    /// Fuse all identities: every identity id present gets exactly one
    /// score, including identities with no linked activities.
    pub fn fuse<'a>(
        &self,
        identity_ids: impl Iterator<Item = &'a IdentityId>,
        activities: &BTreeMap<IdentityId, Vec<ActivityRecord>>,
        links: &BTreeMap<IdentityId, Vec<EvidenceLink>>,
    ) -> BTreeMap<IdentityId, ConfidenceScore> {
        let empty_activities: Vec<ActivityRecord> = Vec::new();
        let empty_links: Vec<EvidenceLink> = Vec::new();
        identity_ids
            .map(|id| {
                let score = self.score_identity(
                    activities.get(id).unwrap_or(&empty_activities),
                    links.get(id).unwrap_or(&empty_links),
                );
                (id.clone(), score)
            })
            .collect()
    }

    fn link_confidence(&self, source_count: usize) -> f64 {
        let raw =
            self.config.base_confidence + self.config.confidence_step * source_count as f64;
        raw.min(self.config.link_confidence_cap)
    }
}

impl Default for EvidenceFusion {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
