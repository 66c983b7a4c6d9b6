//! Source linker: resolves each observation record to a canonical identity
//! and appends normalized activity records.
//!
//! Resolution follows an ordered matching policy; the first strategy that
//! produces an identity wins, and the outcome is deterministic within a
//! run. Records that fail every strategy are dropped silently — only the
//! per-source counts reflect them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crosstrace_tables::{parse_timestamp, DatasetMap, Record, SourceKind, SourceSchema};

use crate::registry::{IdentifierIndex, IdentityRegistry};
use crate::types::{ActivityRecord, IdentityId, Provenance};

/// File suffixes stripped from biometric-face ids before retrying a match.
const FACE_ID_SUFFIXES: [&str; 3] = [".jpg", ".jpeg", ".png"];

// ── Matching Policy ─────────────────────────────────────────────────────

/// Which step of the matching policy produced a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    /// Exact string match against the index.
    Exact,
    /// Case-insensitive scan of index keys.
    CaseInsensitive,
    /// Face-id with a file-extension suffix stripped.
    SuffixStripped,
    /// Substring containment in either direction (canonical-id field
    /// only). Best-effort; false positives on short ids are accepted.
    Containment,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::CaseInsensitive => write!(f, "case-insensitive"),
            Self::SuffixStripped => write!(f, "suffix-stripped"),
            Self::Containment => write!(f, "containment"),
        }
    }
}

/// Outcome of resolving one identifier value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The value resolved to an identity.
    Matched {
        identity_id: IdentityId,
        strategy: MatchStrategy,
    },
    /// No strategy produced an identity; the record is dropped.
    Unmatched,
}

/// Resolve an identifier value against the index.
///
/// Ordered policy, first match wins:
/// 1. exact match;
/// 2. case-insensitive match (fixed sorted-key scan order);
/// 3. for the `face_id` field, retry steps 1 and 2 with a recognized
///    image-file suffix stripped from whichever side carries one;
/// 4. for the `entity_id` field, substring containment in either
///    direction against index keys in scan order.
pub fn resolve_identifier(
    index: &IdentifierIndex,
    raw: &str,
    identifier_field: &str,
) -> MatchOutcome {
    if let Some(id) = index.resolve_exact(raw) {
        return MatchOutcome::Matched {
            identity_id: id.clone(),
            strategy: MatchStrategy::Exact,
        };
    }

    if let Some(id) = index.resolve_case_insensitive(raw) {
        return MatchOutcome::Matched {
            identity_id: id.clone(),
            strategy: MatchStrategy::CaseInsensitive,
        };
    }

    if identifier_field == "face_id" {
        // The suffix may sit on either side: the observed value
        // ("F200.jpg" against a registered "F200") or the registered
        // identifier ("F200" against a registered "F200.jpg").
        if let Some(stem) = strip_face_suffix(raw) {
            if let Some(id) = index
                .resolve_exact(stem)
                .or_else(|| index.resolve_case_insensitive(stem))
            {
                return MatchOutcome::Matched {
                    identity_id: id.clone(),
                    strategy: MatchStrategy::SuffixStripped,
                };
            }
        }
        let key_stem_hit = index.iter().find(|(key, _)| {
            strip_face_suffix(key).is_some_and(|stem| stem.eq_ignore_ascii_case(raw))
        });
        if let Some((_, id)) = key_stem_hit {
            return MatchOutcome::Matched {
                identity_id: id.clone(),
                strategy: MatchStrategy::SuffixStripped,
            };
        }
    }

    if identifier_field == "entity_id" {
        let hit = index
            .iter()
            .find(|(key, _)| key.contains(raw) || raw.contains(key.as_str()));
        if let Some((_, id)) = hit {
            return MatchOutcome::Matched {
                identity_id: id.clone(),
                strategy: MatchStrategy::Containment,
            };
        }
    }

    MatchOutcome::Unmatched
}

fn strip_face_suffix(raw: &str) -> Option<&str> {
    let lower = raw.to_ascii_lowercase();
    FACE_ID_SUFFIXES
        .iter()
        .find(|suffix| lower.ends_with(*suffix))
        .map(|suffix| &raw[..raw.len() - suffix.len()])
}

// ── Link Statistics ─────────────────────────────────────────────────────

/// Per-source linking diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Dataset key of the source.
    pub source: String,
    /// Records seen in the source table.
    pub total_records: usize,
    /// Records whose identifier resolved.
    pub linked: usize,
}

impl LinkStats {
    /// Records dropped as unlinkable.
    pub fn unlinked(&self) -> usize {
        self.total_records - self.linked
    }
}

// ── Link Report ─────────────────────────────────────────────────────────

/// Everything linking produced: per-identity activities and per-source
/// diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkReport {
    /// Linked activities keyed by identity, in linking order per identity.
    pub activities: BTreeMap<IdentityId, Vec<ActivityRecord>>,
    /// One entry per source table that was present in the input.
    pub stats: Vec<LinkStats>,
}

impl LinkReport {
    /// Total linked activities across all identities.
    pub fn linked_total(&self) -> usize {
        self.activities.values().map(Vec::len).sum()
    }
}

// ── Source Linker ───────────────────────────────────────────────────────

/// Links every record of every recognized source to a canonical identity.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceLinker;

impl SourceLinker {
    /// Run linking over all recognized sources in fixed order.
    ///
    /// An absent source table is skipped without a stats entry. A present
    /// table whose declared identifier column never appears is skipped
    /// with a zero-linked stats entry. Unresolvable records are dropped
    /// silently and show up only as `total - linked`.
    pub fn link_all(&self, datasets: &DatasetMap, registry: &IdentityRegistry) -> LinkReport {
        let mut report = LinkReport::default();

        for kind in SourceKind::all() {
            let schema = SourceSchema::for_kind(kind);
            let Some(table) = datasets.get(kind.dataset_key()) else {
                info!(source = %kind, "source absent, skipping");
                continue;
            };

            let mut stats = LinkStats {
                source: kind.dataset_key().to_string(),
                total_records: table.len(),
                linked: 0,
            };

            if !table.has_column(schema.identifier_field) {
                info!(
                    source = %kind,
                    column = schema.identifier_field,
                    "identifier column missing, skipping source"
                );
                report.stats.push(stats);
                continue;
            }

            for record in table.rows() {
                let Some(raw) = record.text(schema.identifier_field) else {
                    continue;
                };
                match resolve_identifier(registry.index(), &raw, schema.identifier_field) {
                    MatchOutcome::Matched {
                        identity_id,
                        strategy,
                    } => {
                        if strategy != MatchStrategy::Exact {
                            debug!(
                                source = %kind,
                                identifier = %raw,
                                identity = %identity_id,
                                %strategy,
                                "fallback match"
                            );
                        }
                        let activity = build_activity(&identity_id, &schema, record);
                        report
                            .activities
                            .entry(identity_id)
                            .or_default()
                            .push(activity);
                        stats.linked += 1;
                    }
                    MatchOutcome::Unmatched => {}
                }
            }

            info!(
                source = %kind,
                total = stats.total_records,
                linked = stats.linked,
                "source linked"
            );
            report.stats.push(stats);
        }

        report
    }
}

fn build_activity(
    identity_id: &IdentityId,
    schema: &SourceSchema,
    record: &Record,
) -> ActivityRecord {
    let timestamp = record
        .get(schema.timestamp_field)
        .and_then(parse_timestamp);
    let location = schema
        .location_candidates()
        .iter()
        .find_map(|field| record.text(field));

    ActivityRecord {
        identity_id: identity_id.clone(),
        activity_type: schema.kind.activity_type().to_string(),
        source_name: schema.kind.dataset_key().to_string(),
        raw_fields: record.to_raw_fields(),
        timestamp,
        location,
        confidence: 1.0,
        provenance: Provenance::DirectMatch {
            field: schema.identifier_field.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstrace_tables::{Record, Table, PROFILE_KEY};

    fn registry_with(rows: Vec<Record>) -> IdentityRegistry {
        let mut table = Table::new(PROFILE_KEY);
        for row in rows {
            table.push(row);
        }
        let mut datasets = DatasetMap::new();
        datasets.insert(PROFILE_KEY, table);
        IdentityRegistry::from_datasets(&datasets).unwrap()
    }

    fn one_identity() -> IdentityRegistry {
        registry_with(vec![Record::new()
            .with("entity_id", "E1")
            .with("card_id", "C100")
            .with("device_hash", "dh:abc")
            .with("face_id", "F200")])
    }

    #[test]
    fn exact_match_wins_first() {
        let registry = one_identity();
        let outcome = resolve_identifier(registry.index(), "C100", "card_id");
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                identity_id: IdentityId::from("E1"),
                strategy: MatchStrategy::Exact,
            }
        );
    }

    #[test]
    fn case_insensitive_fallback() {
        let registry = one_identity();
        let outcome = resolve_identifier(registry.index(), "c100", "card_id");
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                identity_id: IdentityId::from("E1"),
                strategy: MatchStrategy::CaseInsensitive,
            }
        );
    }

    #[test]
    fn face_suffix_stripping_only_for_face_field() {
        let registry = one_identity();
        let outcome = resolve_identifier(registry.index(), "F200.jpg", "face_id");
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                identity_id: IdentityId::from("E1"),
                strategy: MatchStrategy::SuffixStripped,
            }
        );
        // Same value through a non-face field stays unmatched.
        let outcome = resolve_identifier(registry.index(), "F200.jpg", "card_id");
        assert_eq!(outcome, MatchOutcome::Unmatched);
    }

    #[test]
    fn face_suffix_on_registered_side() {
        // Registry carries "F500.jpg"; the observation carries the bare
        // stem.
        let registry = registry_with(vec![Record::new()
            .with("entity_id", "E3")
            .with("face_id", "F500.jpg")]);
        let outcome = resolve_identifier(registry.index(), "F500", "face_id");
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                identity_id: IdentityId::from("E3"),
                strategy: MatchStrategy::SuffixStripped,
            }
        );
    }

    #[test]
    fn face_suffix_case_insensitive_stem() {
        let registry = one_identity();
        let outcome = resolve_identifier(registry.index(), "f200.JPG", "face_id");
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                identity_id: IdentityId::from("E1"),
                strategy: MatchStrategy::SuffixStripped,
            }
        );
    }

    #[test]
    fn containment_only_for_canonical_id_field() {
        let registry = one_identity();
        // "ID-E1-X" contains the index key "E1".
        let outcome = resolve_identifier(registry.index(), "ID-E1-X", "entity_id");
        assert_eq!(
            outcome,
            MatchOutcome::Matched {
                identity_id: IdentityId::from("E1"),
                strategy: MatchStrategy::Containment,
            }
        );
        let outcome = resolve_identifier(registry.index(), "ID-E1-X", "card_id");
        assert_eq!(outcome, MatchOutcome::Unmatched);
    }

    #[test]
    fn unknown_identifier_is_unmatched() {
        let registry = one_identity();
        let outcome = resolve_identifier(registry.index(), "C999", "card_id");
        assert_eq!(outcome, MatchOutcome::Unmatched);
    }

    #[test]
    fn matching_is_deterministic() {
        let registry = one_identity();
        let first = resolve_identifier(registry.index(), "c100", "card_id");
        for _ in 0..20 {
            assert_eq!(
                resolve_identifier(registry.index(), "c100", "card_id"),
                first
            );
        }
    }

    #[test]
    fn link_all_builds_activities_and_stats() {
        let registry = one_identity();

        let mut swipes = Table::new("card_swipes");
        swipes.push(
            Record::new()
                .with("card_id", "C100")
                .with("timestamp", "2024-03-01 09:00:00")
                .with("location_id", "GATE-2"),
        );
        swipes.push(Record::new().with("card_id", "C999")); // unknown, dropped
        let mut datasets = DatasetMap::new();
        datasets.insert("card_swipes", swipes);

        let report = SourceLinker.link_all(&datasets, &registry);
        assert_eq!(report.linked_total(), 1);
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.stats[0].total_records, 2);
        assert_eq!(report.stats[0].linked, 1);
        assert_eq!(report.stats[0].unlinked(), 1);

        let activities = &report.activities[&IdentityId::from("E1")];
        assert_eq!(activities.len(), 1);
        let activity = &activities[0];
        assert_eq!(activity.activity_type, "card_swipe");
        assert_eq!(activity.source_name, "card_swipes");
        assert_eq!(activity.location.as_deref(), Some("GATE-2"));
        assert!(activity.timestamp.is_some());
        assert!((activity.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(activity.provenance.to_string(), "direct_card_id_match");
    }

    #[test]
    fn missing_identifier_column_skips_source() {
        let registry = one_identity();
        let mut swipes = Table::new("card_swipes");
        swipes.push(Record::new().with("badge", "C100"));
        let mut datasets = DatasetMap::new();
        datasets.insert("card_swipes", swipes);

        let report = SourceLinker.link_all(&datasets, &registry);
        assert_eq!(report.linked_total(), 0);
        assert_eq!(report.stats.len(), 1);
        assert_eq!(report.stats[0].linked, 0);
        assert_eq!(report.stats[0].total_records, 1);
    }

    #[test]
    fn absent_source_has_no_stats_entry() {
        let registry = one_identity();
        let datasets = DatasetMap::new();
        let report = SourceLinker.link_all(&datasets, &registry);
        assert!(report.stats.is_empty());
        assert_eq!(report.linked_total(), 0);
    }

    #[test]
    fn unparseable_timestamp_still_links() {
        let registry = one_identity();
        let mut swipes = Table::new("card_swipes");
        swipes.push(
            Record::new()
                .with("card_id", "C100")
                .with("timestamp", "yesterday-ish"),
        );
        let mut datasets = DatasetMap::new();
        datasets.insert("card_swipes", swipes);

        let report = SourceLinker.link_all(&datasets, &registry);
        let activities = &report.activities[&IdentityId::from("E1")];
        assert_eq!(activities.len(), 1);
        assert!(activities[0].timestamp.is_none());
    }

    #[test]
    fn location_candidates_tried_in_order() {
        let registry = one_identity();
        let mut assoc = Table::new("network_assoc");
        assoc.push(
            Record::new()
                .with("device_hash", "dh:abc")
                .with("ap_id", "AP-7")
                .with("room_id", "R-101"),
        );
        let mut datasets = DatasetMap::new();
        datasets.insert("network_assoc", assoc);

        let report = SourceLinker.link_all(&datasets, &registry);
        let activities = &report.activities[&IdentityId::from("E1")];
        // location_id absent, ap_id beats room_id.
        assert_eq!(activities[0].location.as_deref(), Some("AP-7"));
    }

    #[test]
    fn conservation_across_sources() {
        let registry = registry_with(vec![
            Record::new().with("entity_id", "E1").with("card_id", "C100"),
            Record::new().with("entity_id", "E2").with("card_id", "C200"),
        ]);

        let mut swipes = Table::new("card_swipes");
        swipes.push(Record::new().with("card_id", "C100"));
        swipes.push(Record::new().with("card_id", "C200"));
        swipes.push(Record::new().with("card_id", "C300"));
        let mut checkouts = Table::new("checkouts");
        checkouts.push(Record::new().with("entity_id", "E1"));
        let mut datasets = DatasetMap::new();
        datasets.insert("card_swipes", swipes);
        datasets.insert("checkouts", checkouts);

        let report = SourceLinker.link_all(&datasets, &registry);
        let stats_sum: usize = report.stats.iter().map(|s| s.linked).sum();
        assert_eq!(stats_sum, report.linked_total());
        assert_eq!(stats_sum, 3);
    }
}
