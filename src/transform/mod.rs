// Entity → feature normalization

mod attributes;
mod observed;

#[cfg(test)]
mod tests;

pub use attributes::{extract_attributes, Attribute};
pub use observed::{parse_timestamp, ObservedAtRules};

use crate::entity::Entity;
use crate::geometry::{self, Geometry};
use serde::Serialize;
use tracing::debug;

/// Normalized, render-ready projection of one entity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Feature {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Epoch milliseconds of the observation, when known and parsable
    #[serde(rename = "observedAt", skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<i64>,
    /// Observation date as it appeared on the record
    #[serde(skip)]
    pub observed_raw: Option<String>,
    pub geometry: Geometry,
    pub attributes: Vec<Attribute>,
}

/// Ordered features produced by one fetch cycle.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Converts entity records into a feature collection.
///
/// Pure and deterministic: the same entities always yield the same
/// collection. Records without a usable geometry are skipped; one bad
/// record never blocks the others.
#[derive(Clone, Debug, Default)]
pub struct EntityTransformer {
    rules: ObservedAtRules,
}

impl EntityTransformer {
    pub fn new(rules: ObservedAtRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ObservedAtRules {
        &self.rules
    }

    pub fn transform(&self, entities: &[Entity]) -> FeatureCollection {
        let collection: FeatureCollection =
            entities.iter().filter_map(|e| self.to_feature(e)).collect();

        debug!(
            entities = entities.len(),
            features = collection.len(),
            "Transformed entities"
        );
        collection
    }

    /// Project a single entity, or `None` when it has no renderable geometry.
    pub fn to_feature(&self, entity: &Entity) -> Option<Feature> {
        let geometry = match entity.location.as_ref().and_then(Geometry::from_json) {
            Some(g) if geometry::is_valid(&g) => g,
            Some(g) => {
                debug!(entity_id = %entity.id, kind = g.kind(), "Invalid geometry, skipping");
                return None;
            }
            None => {
                debug!(entity_id = %entity.id, "Missing or unsupported location, skipping");
                return None;
            }
        };

        let (observed_raw, observed_at) = self.rules.resolve(entity);

        Some(Feature {
            id: entity.id.clone(),
            entity_type: entity.entity_type.clone(),
            label: resolve_label(entity),
            status: entity.text("status"),
            observed_at,
            observed_raw,
            geometry,
            attributes: extract_attributes(entity),
        })
    }
}

/// Transform with the built-in observed-at rules.
pub fn transform(entities: &[Entity]) -> FeatureCollection {
    EntityTransformer::default().transform(entities)
}

/// Display label: non-empty `name`, else the segment after the last `:` of
/// the id, else the id itself.
pub fn resolve_label(entity: &Entity) -> String {
    if let Some(name) = entity.text("name") {
        return name;
    }

    match entity.id.rsplit(':').next() {
        Some(tail) if !tail.is_empty() => tail.to_string(),
        _ => entity.id.clone(),
    }
}
