#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region index for the risk overlay.
//!
//! Maps each neighborhood's natural key to the dense integer slot the map
//! renderer uses to address per-feature state. The index is built once from
//! the neighborhood `GeoJSON` `FeatureCollection` and is read-only afterward.

use std::collections::HashMap;

use geojson::{Feature, GeoJson, feature::Id};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Position of a region in the loaded collection, used as its feature id.
pub type Slot = usize;

/// Errors that can occur while loading the region collection.
#[derive(Debug, Error)]
pub enum RegionError {
    /// The payload is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The payload is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Expected a FeatureCollection, got a {kind}")]
    NotACollection {
        /// The `GeoJSON` object type that was found instead.
        kind: &'static str,
    },
}

/// Which feature property holds a region's natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionKeyFields {
    /// Property field containing the neighborhood name.
    pub name: String,
}

impl Default for RegionKeyFields {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
        }
    }
}

/// A key that appeared on more than one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    /// The repeated key.
    pub key: String,
    /// Slot that no longer resolves through the index.
    pub shadowed_slot: Slot,
    /// Slot the key resolves to.
    pub winning_slot: Slot,
}

/// Immutable key -> slot mapping over a region collection.
///
/// Slots are contiguous `0..len()` and equal each region's position in the
/// collection. If two regions share a key, the later one wins lookups and
/// the earlier slot is recorded in [`RegionIndex::duplicate_keys`].
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    slots: HashMap<String, Slot>,
    keys: Vec<String>,
    duplicates: Vec<DuplicateKey>,
}

impl RegionIndex {
    /// Builds the index using the default `name` property.
    #[must_use]
    pub fn build(features: &[Feature]) -> Self {
        Self::build_with(features, &RegionKeyFields::default())
    }

    /// Builds the index reading the natural key from `fields.name`.
    ///
    /// Falls back to the feature `id`, then to the feature's position.
    #[must_use]
    pub fn build_with(features: &[Feature], fields: &RegionKeyFields) -> Self {
        let mut slots = HashMap::with_capacity(features.len());
        let mut keys = Vec::with_capacity(features.len());
        let mut duplicates = Vec::new();

        for (slot, feature) in features.iter().enumerate() {
            let key = region_key(feature, fields, slot);
            if let Some(shadowed_slot) = slots.insert(key.clone(), slot) {
                log::warn!(
                    "Duplicate region key '{key}': slot {slot} replaces slot {shadowed_slot}"
                );
                duplicates.push(DuplicateKey {
                    key: key.clone(),
                    shadowed_slot,
                    winning_slot: slot,
                });
            }
            keys.push(key);
        }

        log::info!(
            "Built region index: {} regions, {} duplicate keys",
            keys.len(),
            duplicates.len()
        );

        Self {
            slots,
            keys,
            duplicates,
        }
    }

    /// Looks up the slot for a region key.
    #[must_use]
    pub fn slot(&self, key: &str) -> Option<Slot> {
        self.slots.get(key).copied()
    }

    /// Returns the key derived for the region at `slot`.
    #[must_use]
    pub fn key_for_slot(&self, slot: Slot) -> Option<&str> {
        self.keys.get(slot).map(String::as_str)
    }

    /// Number of slots (equal to the number of regions loaded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the collection was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates every `(key, slot)` pair that resolves through the index.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Slot)> {
        self.slots.iter().map(|(k, s)| (k.as_str(), *s))
    }

    /// Keys that appeared more than once while building.
    #[must_use]
    pub fn duplicate_keys(&self) -> &[DuplicateKey] {
        &self.duplicates
    }

    /// Writes each feature's slot into its `id` so the collection can be
    /// handed to the renderer with slots as feature ids.
    ///
    /// `features` must be the collection this index was built from.
    pub fn assign_feature_ids(&self, features: &mut [Feature]) {
        for (slot, feature) in features.iter_mut().enumerate().take(self.len()) {
            feature.id = Some(Id::Number(slot.into()));
        }
    }
}

/// Derives a region's natural key: name property, then feature id, then
/// position.
fn region_key(feature: &Feature, fields: &RegionKeyFields, position: Slot) -> String {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get(&fields.name))
        .and_then(property_to_key)
        .or_else(|| {
            feature.id.as_ref().map(|id| match id {
                Id::String(s) => s.clone(),
                Id::Number(n) => n.to_string(),
            })
        })
        .unwrap_or_else(|| position.to_string())
}

fn property_to_key(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a `/neighborhoods` payload into its features.
///
/// # Errors
///
/// Returns [`RegionError`] if the body is not `GeoJSON` or is not a
/// `FeatureCollection`.
pub fn parse_feature_collection(body: &str) -> Result<Vec<Feature>, RegionError> {
    match body.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(_) => Err(RegionError::NotACollection { kind: "Feature" }),
        GeoJson::Geometry(_) => Err(RegionError::NotACollection { kind: "Geometry" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(features: &[serde_json::Value]) -> Vec<Feature> {
        let body = serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        });
        parse_feature_collection(&body.to_string()).unwrap()
    }

    fn named(name: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "properties": {"name": name},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-122.42, 37.76], [-122.41, 37.76], [-122.41, 37.75], [-122.42, 37.76]]]
            }
        })
    }

    fn unnamed(id: Option<serde_json::Value>) -> serde_json::Value {
        let mut feature = serde_json::json!({
            "type": "Feature",
            "properties": {},
            "geometry": null
        });
        if let Some(id) = id {
            feature["id"] = id;
        }
        feature
    }

    #[test]
    fn assigns_slots_in_input_order() {
        let features = collection(&[named("Mission"), named("SoMa")]);
        let index = RegionIndex::build(&features);
        assert_eq!(index.len(), 2);
        assert_eq!(index.slot("Mission"), Some(0));
        assert_eq!(index.slot("SoMa"), Some(1));
        assert_eq!(index.key_for_slot(1), Some("SoMa"));
        assert_eq!(index.slot("Tenderloin"), None);
    }

    #[test]
    fn falls_back_to_feature_id() {
        let mut features: Vec<serde_json::Value> =
            (0..10).map(|i| named(&format!("Region {i}"))).collect();
        features[7] = unnamed(Some(serde_json::json!(7)));
        let index = RegionIndex::build(&collection(&features));

        assert_eq!(index.len(), 10);
        assert_eq!(index.slot("7"), Some(7));
        assert_eq!(index.key_for_slot(7), Some("7"));
    }

    #[test]
    fn falls_back_to_string_id_then_position() {
        let features = collection(&[
            unnamed(Some(serde_json::json!("nbhd-a"))),
            unnamed(None),
            named(""),
        ]);
        let index = RegionIndex::build(&features);
        assert_eq!(index.slot("nbhd-a"), Some(0));
        assert_eq!(index.slot("1"), Some(1));
        assert_eq!(index.slot("2"), Some(2));
    }

    #[test]
    fn reads_custom_name_property() {
        let features = collection(&[serde_json::json!({
            "type": "Feature",
            "properties": {"nhood": "Bayview", "name": "ignored"},
            "geometry": null
        })]);
        let fields = RegionKeyFields {
            name: "nhood".to_string(),
        };
        let index = RegionIndex::build_with(&features, &fields);
        assert_eq!(index.slot("Bayview"), Some(0));
        assert_eq!(index.slot("ignored"), None);
    }

    #[test]
    fn later_duplicate_wins_lookup() {
        let features = collection(&[named("Mission"), named("SoMa"), named("Mission")]);
        let index = RegionIndex::build(&features);

        assert_eq!(index.len(), 3);
        assert_eq!(index.slot("Mission"), Some(2));
        assert_eq!(index.entries().count(), 2);
        assert_eq!(
            index.duplicate_keys(),
            &[DuplicateKey {
                key: "Mission".to_string(),
                shadowed_slot: 0,
                winning_slot: 2,
            }]
        );
    }

    #[test]
    fn assigns_slots_as_feature_ids() {
        let mut features = collection(&[unnamed(Some(serde_json::json!("x"))), named("SoMa")]);
        let index = RegionIndex::build(&features);
        index.assign_feature_ids(&mut features);
        assert_eq!(features[0].id, Some(Id::Number(0.into())));
        assert_eq!(features[1].id, Some(Id::Number(1.into())));
    }

    #[test]
    fn unusable_name_values_fall_through_to_feature_id() {
        let mut empty = unnamed(Some(serde_json::json!(11)));
        empty["properties"]["name"] = serde_json::json!("");
        let mut flag = unnamed(Some(serde_json::json!("bayview")));
        flag["properties"]["name"] = serde_json::json!(true);

        let index = RegionIndex::build(&collection(&[empty, flag]));
        assert_eq!(index.key_for_slot(0), Some("11"));
        assert_eq!(index.key_for_slot(1), Some("bayview"));
        assert_eq!(index.slot("true"), None);
    }

    #[test]
    fn empty_collection_builds_empty_index() {
        let index = RegionIndex::build(&collection(&[]));
        assert!(index.is_empty());
        assert_eq!(index.entries().count(), 0);
    }

    #[test]
    fn rejects_non_collection_payload() {
        let body = unnamed(None).to_string();
        assert!(matches!(
            parse_feature_collection(&body),
            Err(RegionError::NotACollection { kind: "Feature" })
        ));
        assert!(matches!(
            parse_feature_collection("not json"),
            Err(RegionError::GeoJson(_))
        ));
    }
}
