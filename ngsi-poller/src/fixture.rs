use crate::source::EntitySource;
use crate::types::{EntityQuery, FetchError};
use async_trait::async_trait;
use ngsi_map::Entity;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Stub entities served when no broker is configured.
pub struct FixtureSource {
    entities: Vec<Entity>,
}

fn station(id: &str, entity_type: &str, name: &str, status: &str, lon: f64, lat: f64) -> Value {
    json!({
        "id": id,
        "type": entity_type,
        "name": { "type": "Property", "value": name },
        "status": { "type": "Property", "value": status },
        "location": {
            "type": "GeoProperty",
            "value": { "type": "Point", "coordinates": [lon, lat] }
        }
    })
}

impl FixtureSource {
    pub fn new() -> Self {
        let records = [
            station("urn:ngsi-ld:Station:central", "Station", "Central", "active", 18.0649, 59.3326),
            station("urn:ngsi-ld:Station:north", "Station", "North", "maintenance", 18.035, 59.357),
            station("urn:ngsi-ld:Sensor:beta", "Sensor", "Beta", "active", 18.09, 59.318),
        ];
        Self::from_records(&records)
    }

    /// Fixture over caller-supplied records; malformed ones are dropped.
    pub fn from_records(records: &[Value]) -> Self {
        Self {
            entities: records
                .iter()
                .filter_map(|r| Entity::from_json(r).ok())
                .collect(),
        }
    }
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntitySource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, FetchError> {
        let limit = query.limit.filter(|l| *l > 0).map_or(usize::MAX, |l| l as usize);
        Ok(self
            .entities
            .iter()
            .filter(|e| match query.entity_type.as_deref() {
                Some(t) if !t.is_empty() => e.entity_type == t,
                _ => true,
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_types(&self) -> Result<Vec<String>, FetchError> {
        let types: BTreeSet<&str> = self.entities.iter().map(|e| e.entity_type.as_str()).collect();
        Ok(types.into_iter().map(str::to_string).collect())
    }
}
