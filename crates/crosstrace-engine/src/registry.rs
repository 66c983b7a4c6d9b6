//! Identity registry and identifier index.
//!
//! The registry holds every canonical identity from the profile table; the
//! index maps every raw identifier string any of them claims to exactly one
//! identity id. Both are built once at load time and read-only afterwards.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crosstrace_tables::{DatasetMap, IDENTIFIER_FIELDS, PROFILE_KEY};

use crate::error::{ResolveError, ResolveResult};
use crate::types::{Identity, IdentityId, DIRECT_MAPPING};

// ── Identifier Index ────────────────────────────────────────────────────

/// Lookup from raw identifier string to canonical identity id.
///
/// Every raw identifier maps to at most one identity. When two identities
/// claim the same raw identifier, the later-registered one silently wins
/// (last-write-wins) — an accepted ambiguity, counted for visibility but
/// never an error.
#[derive(Clone, Debug, Default)]
pub struct IdentifierIndex {
    entries: BTreeMap<String, IdentityId>,
    collisions: usize,
}

impl IdentifierIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw identifier for an identity. Last write wins on
    /// collision.
    pub fn insert(&mut self, raw: impl Into<String>, identity: IdentityId) {
        let raw = raw.into();
        if let Some(previous) = self.entries.insert(raw.clone(), identity.clone()) {
            if previous != identity {
                self.collisions += 1;
                debug!(
                    identifier = %raw,
                    previous = %previous,
                    winner = %identity,
                    "identifier collision, later registration wins"
                );
            }
        }
    }

    /// Exact string lookup.
    pub fn resolve_exact(&self, raw: &str) -> Option<&IdentityId> {
        self.entries.get(raw)
    }

    /// Case-insensitive lookup by scanning keys in sorted order.
    ///
    /// If multiple keys differ only by case, the first in sorted-key order
    /// wins. The order is fixed across runs but otherwise arbitrary — a
    /// documented ambiguity, not corrected here.
    pub fn resolve_case_insensitive(&self, raw: &str) -> Option<&IdentityId> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(raw))
            .map(|(_, id)| id)
    }

    /// Keys and ids in sorted-key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IdentityId)> {
        self.entries.iter()
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many last-write-wins collisions occurred during build.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

// ── Identity Registry ───────────────────────────────────────────────────

/// Canonical identity records plus the identifier index over them.
#[derive(Clone, Debug, Default)]
pub struct IdentityRegistry {
    identities: BTreeMap<IdentityId, Identity>,
    index: IdentifierIndex,
    /// Profile rows skipped for lacking a canonical id.
    skipped_rows: usize,
}

impl IdentityRegistry {
    /// Build the registry and index from the profile table.
    ///
    /// Fails only when the profile table is absent entirely. Per-row
    /// missing identifier fields are skipped; rows without a canonical id
    /// are skipped and counted.
    pub fn from_datasets(datasets: &DatasetMap) -> ResolveResult<Self> {
        let profiles = datasets
            .get(PROFILE_KEY)
            .ok_or(ResolveError::MissingProfileTable)?;

        let mut registry = Self::default();

        for row in profiles.rows() {
            let Some(raw_id) = row.text("entity_id") else {
                registry.skipped_rows += 1;
                continue;
            };
            let id = IdentityId::new(raw_id);

            let mut identifiers = Vec::new();
            for field in IDENTIFIER_FIELDS {
                if let Some(value) = row.text(field) {
                    registry.index.insert(value.clone(), id.clone());
                    identifiers.push(value);
                }
            }

            let identity = Identity {
                id: id.clone(),
                name: row.text("name").unwrap_or_else(|| "Unknown".into()),
                role: row.text("role").unwrap_or_else(|| "Unknown".into()),
                email: row.text("email").unwrap_or_default(),
                department: row.text("department").unwrap_or_default(),
                identifiers,
                resolution_method: DIRECT_MAPPING.into(),
            };
            registry.identities.insert(id, identity);
        }

        info!(
            identities = registry.identities.len(),
            identifiers = registry.index.len(),
            collisions = registry.index.collisions(),
            skipped_rows = registry.skipped_rows,
            "identity registry built"
        );
        Ok(registry)
    }

    /// Look up an identity by id.
    pub fn get(&self, id: &IdentityId) -> Option<&Identity> {
        self.identities.get(id)
    }

    /// All identities in id order.
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.identities.values()
    }

    /// All identity ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &IdentityId> {
        self.identities.keys()
    }

    /// The identifier index.
    pub fn index(&self) -> &IdentifierIndex {
        &self.index
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the registry holds no identities.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Profile rows skipped for lacking a canonical id.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstrace_tables::{Record, Table};

    fn profile_row(id: &str, card: &str) -> Record {
        Record::new()
            .with("entity_id", id)
            .with("name", format!("Person {id}"))
            .with("role", "member")
            .with("card_id", card)
    }

    fn datasets_with_profiles(rows: Vec<Record>) -> DatasetMap {
        let mut table = Table::new(PROFILE_KEY);
        for row in rows {
            table.push(row);
        }
        let mut datasets = DatasetMap::new();
        datasets.insert(PROFILE_KEY, table);
        datasets
    }

    #[test]
    fn missing_profile_table_is_fatal() {
        let datasets = DatasetMap::new();
        let result = IdentityRegistry::from_datasets(&datasets);
        assert!(matches!(result, Err(ResolveError::MissingProfileTable)));
    }

    #[test]
    fn registry_indexes_all_identifier_fields() {
        let row = Record::new()
            .with("entity_id", "E1")
            .with("member_id", "M-77")
            .with("card_id", "C100")
            .with("device_hash", "dh:abc")
            .with("face_id", "F200")
            .with("email", "e1@example.org");
        let registry =
            IdentityRegistry::from_datasets(&datasets_with_profiles(vec![row])).unwrap();

        for raw in ["E1", "M-77", "C100", "dh:abc", "F200", "e1@example.org"] {
            assert_eq!(
                registry.index().resolve_exact(raw),
                Some(&IdentityId::from("E1")),
                "identifier {raw} should resolve"
            );
        }
        let identity = registry.get(&IdentityId::from("E1")).unwrap();
        assert_eq!(identity.identifiers.len(), 6);
        assert_eq!(identity.resolution_method, DIRECT_MAPPING);
    }

    #[test]
    fn per_row_missing_fields_are_skipped_not_fatal() {
        let row = Record::new().with("entity_id", "E2");
        let registry =
            IdentityRegistry::from_datasets(&datasets_with_profiles(vec![row])).unwrap();
        let identity = registry.get(&IdentityId::from("E2")).unwrap();
        assert_eq!(identity.identifiers, vec!["E2".to_string()]);
        assert_eq!(identity.name, "Unknown");
        assert_eq!(identity.email, "");
    }

    #[test]
    fn rows_without_canonical_id_are_counted() {
        let rows = vec![
            profile_row("E1", "C100"),
            Record::new().with("card_id", "C999"),
        ];
        let registry = IdentityRegistry::from_datasets(&datasets_with_profiles(rows)).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.skipped_rows(), 1);
    }

    #[test]
    fn identifier_collision_last_write_wins() {
        let rows = vec![profile_row("E1", "SHARED"), profile_row("E2", "SHARED")];
        let registry = IdentityRegistry::from_datasets(&datasets_with_profiles(rows)).unwrap();
        assert_eq!(
            registry.index().resolve_exact("SHARED"),
            Some(&IdentityId::from("E2"))
        );
        assert_eq!(registry.index().collisions(), 1);
    }

    #[test]
    fn disjoint_identifier_sets_stay_disjoint() {
        let rows = vec![profile_row("E1", "C100"), profile_row("E2", "C200")];
        let registry = IdentityRegistry::from_datasets(&datasets_with_profiles(rows)).unwrap();
        assert_eq!(
            registry.index().resolve_exact("C100"),
            Some(&IdentityId::from("E1"))
        );
        assert_eq!(
            registry.index().resolve_exact("C200"),
            Some(&IdentityId::from("E2"))
        );
        assert_eq!(registry.index().collisions(), 0);
    }

    #[test]
    fn case_insensitive_scan_order_is_fixed() {
        let mut index = IdentifierIndex::new();
        index.insert("ABC", IdentityId::from("E1"));
        index.insert("abc", IdentityId::from("E2"));
        // Sorted-key order puts "ABC" before "abc"; repeated calls agree.
        let first = index.resolve_case_insensitive("aBc").cloned();
        assert_eq!(first, Some(IdentityId::from("E1")));
        for _ in 0..10 {
            assert_eq!(index.resolve_case_insensitive("aBc").cloned(), first);
        }
    }
}
