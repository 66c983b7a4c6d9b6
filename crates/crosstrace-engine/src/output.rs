//! Output assembler: projects a [`Resolution`] into the externally
//! consumed report schema.
//!
//! This is a thin, serde-serializable projection — no resolution logic.
//! Downstream summarizers and feature extractors read this schema and
//! nothing else. The only wall-clock-derived value in the whole pipeline
//! is the report's `generated_at` field.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crosstrace_tables::{DatasetMap, FieldValue};

use crate::engine::Resolution;
use crate::types::{ActivityRecord, ConfidenceScore, EvidenceLink, Identity, IdentityId};

// ── Report Schema ───────────────────────────────────────────────────────

/// One activity as downstream consumers see it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    /// Event time; serializes to ISO 8601 or null.
    pub timestamp: Option<DateTime<Utc>>,
    /// Derived location, or null.
    pub location: Option<String>,
    /// The original record fields.
    pub details: BTreeMap<String, FieldValue>,
    /// Link confidence (1.0 for direct matches).
    pub confidence: f64,
    /// Dataset key the record came from.
    pub source: String,
}

impl From<&ActivityRecord> for ActivityItem {
    fn from(activity: &ActivityRecord) -> Self {
        Self {
            timestamp: activity.timestamp,
            location: activity.location.clone(),
            details: activity.raw_fields.clone(),
            confidence: activity.confidence,
            source: activity.source_name.clone(),
        }
    }
}

/// First and last observed activity timestamps.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Earliest timestamped activity, or null.
    pub first_activity: Option<DateTime<Utc>>,
    /// Latest timestamped activity, or null.
    pub last_activity: Option<DateTime<Utc>>,
}

/// Aggregate view of one identity's observed behavior.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSummary {
    /// Total linked activities, timestamped or not.
    pub total_activities: usize,
    /// Distinct locations among timestamped, located activities.
    pub unique_locations: usize,
    /// Locations of timestamped, located activities in time order.
    pub location_sequence: Vec<String>,
    /// Activity-type tags present, sorted.
    pub activity_types: Vec<String>,
    /// First/last timestamped activity.
    pub time_range: TimeRange,
}

/// Everything reported for one identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityReport {
    /// Profile attributes and identifier set.
    pub profile: Identity,
    /// Activities grouped by activity type.
    pub activities: BTreeMap<String, Vec<ActivityItem>>,
    /// Cross-source evidence links.
    pub cross_source_evidence: Vec<EvidenceLink>,
    /// Fused confidence score.
    pub confidence: ConfidenceScore,
    /// Behavioral aggregates.
    pub behavioral_summary: BehavioralSummary,
}

/// Top-level run statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Identities in the registry.
    pub total_identities: usize,
    /// Linked activities across all identities.
    pub total_activities: usize,
    /// Cross-source evidence links across all identities.
    pub total_cross_links: usize,
    /// Source keys actually present in the input.
    pub data_sources_used: Vec<String>,
    /// When this report was assembled. The one wall-clock field.
    pub generated_at: DateTime<Utc>,
}

/// The externally consumed output: per-identity reports plus statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Per-identity reports keyed by identity id.
    pub identities: BTreeMap<IdentityId, IdentityReport>,
    /// Top-level statistics block.
    pub statistics: Statistics,
}

// ── Assembly ────────────────────────────────────────────────────────────

/// Project a resolution into the report schema.
pub fn assemble(resolution: &Resolution, datasets: &DatasetMap) -> ResolutionReport {
    let mut identities = BTreeMap::new();
    for identity in resolution.registry.identities() {
        let activities = resolution.activities_for(&identity.id);
        let report = IdentityReport {
            profile: identity.clone(),
            activities: group_by_type(activities),
            cross_source_evidence: resolution.links_for(&identity.id).to_vec(),
            confidence: resolution
                .score_for(&identity.id)
                .cloned()
                .unwrap_or_else(|| {
                    // Fusion scores every registry identity; this arm only
                    // guards a hand-assembled Resolution.
                    crate::fusion::EvidenceFusion::default().score_identity(&[], &[])
                }),
            behavioral_summary: summarize(activities),
        };
        identities.insert(identity.id.clone(), report);
    }

    ResolutionReport {
        statistics: Statistics {
            total_identities: resolution.registry.len(),
            total_activities: resolution.activity_count(),
            total_cross_links: resolution.evidence_link_count(),
            data_sources_used: datasets.keys().cloned().collect(),
            generated_at: Utc::now(),
        },
        identities,
    }
}

fn group_by_type(activities: &[ActivityRecord]) -> BTreeMap<String, Vec<ActivityItem>> {
    let mut grouped: BTreeMap<String, Vec<ActivityItem>> = BTreeMap::new();
    for activity in activities {
        grouped
            .entry(activity.activity_type.clone())
            .or_default()
            .push(ActivityItem::from(activity));
    }
    grouped
}

fn summarize(activities: &[ActivityRecord]) -> BehavioralSummary {
    let mut located: Vec<(DateTime<Utc>, &str)> = activities
        .iter()
        .filter_map(|a| {
            let ts = a.timestamp?;
            let loc = a.location.as_deref()?;
            Some((ts, loc))
        })
        .collect();
    located.sort_by_key(|(ts, _)| *ts);

    let unique_locations = {
        let mut all: Vec<&str> = located.iter().map(|(_, loc)| *loc).collect();
        all.sort_unstable();
        all.dedup();
        all.len()
    };

    let mut activity_types: Vec<String> = activities
        .iter()
        .map(|a| a.activity_type.clone())
        .collect();
    activity_types.sort();
    activity_types.dedup();

    let timestamps: Vec<DateTime<Utc>> =
        activities.iter().filter_map(|a| a.timestamp).collect();

    BehavioralSummary {
        total_activities: activities.len(),
        unique_locations,
        location_sequence: located.iter().map(|(_, loc)| loc.to_string()).collect(),
        activity_types,
        time_range: TimeRange {
            first_activity: timestamps.iter().min().copied(),
            last_activity: timestamps.iter().max().copied(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResolutionEngine;
    use crosstrace_tables::{Record, Table, PROFILE_KEY};

    fn sample_datasets() -> DatasetMap {
        let mut profiles = Table::new(PROFILE_KEY);
        profiles.push(
            Record::new()
                .with("entity_id", "E1")
                .with("name", "Avery Quinn")
                .with("card_id", "C100")
                .with("face_id", "F200"),
        );

        let mut swipes = Table::new("card_swipes");
        swipes.push(
            Record::new()
                .with("card_id", "C100")
                .with("timestamp", "2024-03-01 09:00:00")
                .with("location_id", "GATE-2"),
        );
        swipes.push(
            Record::new()
                .with("card_id", "C100")
                .with("timestamp", "2024-03-01 12:00:00")
                .with("location_id", "LIB-1"),
        );
        swipes.push(
            Record::new()
                .with("card_id", "C100")
                .with("timestamp", "not a time")
                .with("location_id", "GYM-3"),
        );

        let mut datasets = DatasetMap::new();
        datasets.insert(PROFILE_KEY, profiles);
        datasets.insert("card_swipes", swipes);
        datasets
    }

    fn sample_report() -> ResolutionReport {
        let datasets = sample_datasets();
        let resolution = ResolutionEngine::default().resolve(&datasets).unwrap();
        assemble(&resolution, &datasets)
    }

    #[test]
    fn statistics_block_counts() {
        let report = sample_report();
        assert_eq!(report.statistics.total_identities, 1);
        assert_eq!(report.statistics.total_activities, 3);
        assert_eq!(report.statistics.total_cross_links, 0);
        assert_eq!(
            report.statistics.data_sources_used,
            vec!["card_swipes".to_string(), PROFILE_KEY.to_string()]
        );
    }

    #[test]
    fn activities_grouped_by_type() {
        let report = sample_report();
        let identity = &report.identities[&IdentityId::from("E1")];
        assert_eq!(identity.activities.len(), 1);
        let swipes = &identity.activities["card_swipe"];
        assert_eq!(swipes.len(), 3);
        assert!(swipes.iter().any(|a| a.timestamp.is_none()));
    }

    #[test]
    fn behavioral_summary_orders_locations_by_time() {
        let report = sample_report();
        let summary = &report.identities[&IdentityId::from("E1")].behavioral_summary;
        assert_eq!(summary.total_activities, 3);
        // The unparseable-timestamp activity is excluded from location
        // aggregates; only timestamped activities enter, in time order.
        assert_eq!(summary.unique_locations, 2);
        assert_eq!(
            summary.location_sequence,
            vec!["GATE-2".to_string(), "LIB-1".to_string()]
        );
        assert_eq!(summary.activity_types, vec!["card_swipe".to_string()]);
        assert_eq!(
            summary.time_range.first_activity.unwrap().to_rfc3339(),
            "2024-03-01T09:00:00+00:00"
        );
        assert_eq!(
            summary.time_range.last_activity.unwrap().to_rfc3339(),
            "2024-03-01T12:00:00+00:00"
        );
    }

    #[test]
    fn report_serializes_to_json() {
        let report = sample_report();
        let json = serde_json::to_value(&report).unwrap();
        let identity = &json["identities"]["E1"];
        assert_eq!(identity["profile"]["name"], "Avery Quinn");
        assert_eq!(
            identity["confidence"]["provenance"],
            "multi_modal_fusion"
        );
        // Unparseable timestamp serializes as null.
        let items = identity["activities"]["card_swipe"].as_array().unwrap();
        assert!(items.iter().any(|item| item["timestamp"].is_null()));
    }

    #[test]
    fn empty_time_range_for_unobserved_identity() {
        let mut profiles = Table::new(PROFILE_KEY);
        profiles.push(Record::new().with("entity_id", "E9"));
        let mut datasets = DatasetMap::new();
        datasets.insert(PROFILE_KEY, profiles);

        let resolution = ResolutionEngine::default().resolve(&datasets).unwrap();
        let report = assemble(&resolution, &datasets);
        let summary = &report.identities[&IdentityId::from("E9")].behavioral_summary;
        assert_eq!(summary.total_activities, 0);
        assert!(summary.time_range.first_activity.is_none());
        assert!(summary.location_sequence.is_empty());
        assert_eq!(
            report.identities[&IdentityId::from("E9")]
                .confidence
                .final_confidence,
            0.0
        );
    }
}
