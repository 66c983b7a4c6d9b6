//! Central resolution engine.
//!
//! `ResolutionEngine` runs the full batch pipeline in fixed order:
//! registry build → source linking → per-identity temporal clustering →
//! evidence fusion. The computation is single-pass and deterministic;
//! identical inputs produce an identical [`Resolution`].

use std::collections::BTreeMap;

use tracing::info;

use crosstrace_tables::DatasetMap;

use crate::cluster::TemporalClusterer;
use crate::error::ResolveResult;
use crate::fusion::EvidenceFusion;
use crate::linker::{LinkStats, SourceLinker};
use crate::registry::IdentityRegistry;
use crate::types::{
    ActivityRecord, ConfidenceScore, EvidenceLink, IdentityId, ResolverConfig,
};

// ── Resolution ──────────────────────────────────────────────────────────

/// The full result of one pipeline run.
#[derive(Clone, Debug)]
pub struct Resolution {
    /// Canonical identities and the identifier index.
    pub registry: IdentityRegistry,
    /// Linked activities keyed by identity.
    pub activities: BTreeMap<IdentityId, Vec<ActivityRecord>>,
    /// Cross-source evidence links keyed by identity. Identities without
    /// qualifying clusters are absent.
    pub evidence_links: BTreeMap<IdentityId, Vec<EvidenceLink>>,
    /// Exactly one confidence score per registry identity.
    pub confidence: BTreeMap<IdentityId, ConfidenceScore>,
    /// Per-source linking diagnostics.
    pub link_stats: Vec<LinkStats>,
}

impl Resolution {
    /// Total linked activities across all identities.
    pub fn activity_count(&self) -> usize {
        self.activities.values().map(Vec::len).sum()
    }

    /// Total cross-source evidence links.
    pub fn evidence_link_count(&self) -> usize {
        self.evidence_links.values().map(Vec::len).sum()
    }

    /// One identity's activities, empty when none were linked.
    pub fn activities_for(&self, id: &IdentityId) -> &[ActivityRecord] {
        self.activities.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One identity's evidence links, empty when none were derived.
    pub fn links_for(&self, id: &IdentityId) -> &[EvidenceLink] {
        self.evidence_links
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// One identity's confidence score.
    pub fn score_for(&self, id: &IdentityId) -> Option<&ConfidenceScore> {
        self.confidence.get(id)
    }
}

// ── Resolution Engine ───────────────────────────────────────────────────

/// Runs the identity-resolution and evidence-fusion pipeline.
pub struct ResolutionEngine {
    config: ResolverConfig,
    linker: SourceLinker,
}

impl ResolutionEngine {
    /// Create an engine with the given policy.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            linker: SourceLinker,
        }
    }

    /// The configured policy.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Run the full pipeline over materialized input tables.
    ///
    /// Fails only when the identity registry table is absent; every other
    /// irregular condition is absorbed into the diagnostics carried on
    /// the returned [`Resolution`].
    pub fn resolve(&self, datasets: &DatasetMap) -> ResolveResult<Resolution> {
        let registry = IdentityRegistry::from_datasets(datasets)?;

        let report = self.linker.link_all(datasets, &registry);
        info!(
            identities = registry.len(),
            linked = report.linked_total(),
            "linking complete"
        );

        let clusterer = TemporalClusterer::new(self.config.cluster_window_minutes);
        let fusion = EvidenceFusion::new(self.config.clone());

        let mut evidence_links: BTreeMap<IdentityId, Vec<EvidenceLink>> = BTreeMap::new();
        for (identity_id, activities) in &report.activities {
            let clusters = clusterer.cluster(activities);
            let links = fusion.derive_evidence_links(identity_id, &clusters);
            if !links.is_empty() {
                evidence_links.insert(identity_id.clone(), links);
            }
        }

        let confidence = fusion.fuse(registry.ids(), &report.activities, &evidence_links);
        info!(
            cross_links = evidence_links.values().map(Vec::len).sum::<usize>(),
            scored = confidence.len(),
            "fusion complete"
        );

        Ok(Resolution {
            registry,
            activities: report.activities,
            evidence_links,
            confidence,
            link_stats: report.stats,
        })
    }
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}
