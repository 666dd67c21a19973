use crate::entity::{unwrap_json_ld, Entity, Property};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::BTreeMap;

/// Type-specific preference order for the "observed at" timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedAtRules {
    /// Candidate keys for types without their own entry
    pub default: Vec<String>,
    /// Candidate keys per entity type
    pub by_type: BTreeMap<String, Vec<String>>,
}

impl Default for ObservedAtRules {
    fn default() -> Self {
        let accident = vec!["accidentDate".to_string(), "dateObserved".to_string()];
        let mut by_type = BTreeMap::new();
        by_type.insert("RoadAccident".to_string(), accident.clone());
        by_type.insert("Accident".to_string(), accident);

        Self {
            default: vec!["dateObserved".to_string(), "dateModified".to_string()],
            by_type,
        }
    }
}

impl ObservedAtRules {
    /// Layer configured rules over these. Per-type entries replace the
    /// existing entry for that type; an empty `default` keeps the current one.
    pub fn with_overrides(
        mut self,
        default: &[String],
        by_type: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        if !default.is_empty() {
            self.default = default.to_vec();
        }
        for (entity_type, keys) in by_type {
            self.by_type.insert(entity_type.clone(), keys.clone());
        }
        self
    }

    pub fn candidates(&self, entity_type: &str) -> &[String] {
        self.by_type
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(self.default.as_slice())
    }

    /// Resolve the raw "observed at" text and its epoch-millisecond value.
    ///
    /// The first candidate key holding a date string wins. When that string
    /// does not parse, the timestamp is `None` but the text is still
    /// returned for display.
    pub fn resolve(&self, entity: &Entity) -> (Option<String>, Option<i64>) {
        let raw = self
            .candidates(&entity.entity_type)
            .iter()
            .find_map(|key| entity.get(key).and_then(date_text));

        let timestamp = raw.as_deref().and_then(parse_timestamp);
        (raw, timestamp)
    }
}

/// Date text from a bare string, a Property, or a `@value` wrapper.
fn date_text(value: &Value) -> Option<String> {
    let inner = match Property::from_json(value) {
        Some(property) => property.value,
        None => value.clone(),
    };
    unwrap_json_ld(&inner)
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a date string to epoch milliseconds.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` and `YYYY-MM-DD`;
/// naive forms are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}
