//! Catalog of recognized observation sources.
//!
//! Each source declares, once, how its records are read: which field names
//! an identity, which field carries the event time, and which activity-type
//! tag its records are stamped with. Resolving the schema per source rather
//! than per record keeps the linker free of per-row field guessing.

use serde::{Deserialize, Serialize};

/// Dataset key the identity registry table is looked up under.
pub const PROFILE_KEY: &str = "profiles";

/// Registry columns recognized as identifiers, in registration order.
///
/// Per-row missing entries are tolerated; every non-missing value is
/// registered in the identifier index.
pub const IDENTIFIER_FIELDS: [&str; 7] = [
    "entity_id",
    "member_id",
    "staff_id",
    "card_id",
    "device_hash",
    "face_id",
    "email",
];

/// Location columns tried in order when deriving an activity's location.
pub const LOCATION_FIELDS: [&str; 3] = ["location_id", "ap_id", "room_id"];

// ── Source Kind ─────────────────────────────────────────────────────────

/// The seven recognized observation sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Network association logs (device ↔ access point).
    NetworkAssociation,
    /// Access-card swipe logs.
    CardSwipe,
    /// Checkout records.
    Checkout,
    /// Booking records.
    Booking,
    /// Free-text records (notes, requests).
    FreeText,
    /// Biometric-vector records.
    BiometricVector,
    /// Imagery-frame records.
    ImageryFrame,
}

impl SourceKind {
    /// All sources in fixed linking order.
    pub fn all() -> [SourceKind; 7] {
        [
            Self::NetworkAssociation,
            Self::CardSwipe,
            Self::Checkout,
            Self::Booking,
            Self::FreeText,
            Self::BiometricVector,
            Self::ImageryFrame,
        ]
    }

    /// Key this source's table is looked up under in the dataset map.
    pub fn dataset_key(&self) -> &'static str {
        match self {
            Self::NetworkAssociation => "network_assoc",
            Self::CardSwipe => "card_swipes",
            Self::Checkout => "checkouts",
            Self::Booking => "bookings",
            Self::FreeText => "text_notes",
            Self::BiometricVector => "biometric_vectors",
            Self::ImageryFrame => "imagery_frames",
        }
    }

    /// Activity-type tag stamped on records linked from this source.
    pub fn activity_type(&self) -> &'static str {
        match self {
            Self::NetworkAssociation => "network_association",
            Self::CardSwipe => "card_swipe",
            Self::Checkout => "checkout",
            Self::Booking => "booking",
            Self::FreeText => "free_text",
            Self::BiometricVector => "biometric_vector",
            Self::ImageryFrame => "imagery_frame",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dataset_key())
    }
}

// ── Source Schema ───────────────────────────────────────────────────────

/// Per-source record layout, resolved once per source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceSchema {
    /// Which source this schema describes.
    pub kind: SourceKind,
    /// Field holding the identifier to resolve.
    pub identifier_field: &'static str,
    /// Field holding the event timestamp.
    pub timestamp_field: &'static str,
}

impl SourceSchema {
    /// The declared schema for a source.
    pub fn for_kind(kind: SourceKind) -> Self {
        let (identifier_field, timestamp_field) = match kind {
            SourceKind::NetworkAssociation => ("device_hash", "timestamp"),
            SourceKind::CardSwipe => ("card_id", "timestamp"),
            SourceKind::Checkout => ("entity_id", "timestamp"),
            SourceKind::Booking => ("entity_id", "start_time"),
            SourceKind::FreeText => ("entity_id", "timestamp"),
            SourceKind::BiometricVector => ("face_id", "timestamp"),
            SourceKind::ImageryFrame => ("face_id", "timestamp"),
        };
        Self {
            kind,
            identifier_field,
            timestamp_field,
        }
    }

    /// Location columns tried in order; first present field wins.
    pub fn location_candidates(&self) -> &'static [&'static str] {
        &LOCATION_FIELDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_sources_have_distinct_keys_and_tags() {
        let keys: HashSet<&str> = SourceKind::all().iter().map(|k| k.dataset_key()).collect();
        let tags: HashSet<&str> = SourceKind::all()
            .iter()
            .map(|k| k.activity_type())
            .collect();
        assert_eq!(keys.len(), 7);
        assert_eq!(tags.len(), 7);
        assert!(!keys.contains(PROFILE_KEY));
    }

    #[test]
    fn schema_declares_expected_fields() {
        let schema = SourceSchema::for_kind(SourceKind::Booking);
        assert_eq!(schema.identifier_field, "entity_id");
        assert_eq!(schema.timestamp_field, "start_time");

        let schema = SourceSchema::for_kind(SourceKind::NetworkAssociation);
        assert_eq!(schema.identifier_field, "device_hash");
        assert_eq!(schema.timestamp_field, "timestamp");

        let schema = SourceSchema::for_kind(SourceKind::ImageryFrame);
        assert_eq!(schema.identifier_field, "face_id");
    }

    #[test]
    fn linking_order_is_fixed() {
        let order: Vec<&str> = SourceKind::all().iter().map(|k| k.dataset_key()).collect();
        assert_eq!(
            order,
            vec![
                "network_assoc",
                "card_swipes",
                "checkouts",
                "bookings",
                "text_notes",
                "biometric_vectors",
                "imagery_frames",
            ]
        );
    }

    #[test]
    fn identifier_fields_include_canonical_id() {
        assert_eq!(IDENTIFIER_FIELDS[0], "entity_id");
        assert!(IDENTIFIER_FIELDS.contains(&"email"));
    }
}
