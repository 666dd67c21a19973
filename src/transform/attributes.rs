use crate::entity::{display_string, Entity, Property};
use serde::Serialize;

/// One displayable observation taken from an entity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl Attribute {
    /// Numeric reading of the value, when it is one.
    pub fn as_number(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Pull the dynamic key/value observations off an entity.
///
/// Every non-reserved key is visited in record order. A key contributes an
/// attribute only when its value passes the Property shape check and renders
/// to a non-empty string.
pub fn extract_attributes(entity: &Entity) -> Vec<Attribute> {
    entity
        .extras
        .iter()
        .filter_map(|(key, raw)| {
            let property = Property::from_json(raw)?;
            let value = display_string(&property.value);
            if value.is_empty() {
                return None;
            }
            Some(Attribute {
                key: key.clone(),
                value,
                unit: property.unit_code,
            })
        })
        .collect()
}
