use crate::source::EntitySource;
use ngsi_map::{MapSession, MapSurface};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::info;

/// Envelope keys that may carry the type list, in preference order.
const ENVELOPE_KEYS: [&str; 2] = ["typeList", "types"];

/// Normalize a type catalogue response.
///
/// Accepts a bare array or an envelope object exposing the list under
/// `typeList` (else `types`). Keeps non-empty strings, deduplicated and
/// sorted. Anything else yields an empty list.
pub fn normalize_type_list(body: &Value) -> Vec<String> {
    let list = match body {
        Value::Array(items) => Some(items),
        Value::Object(object) => ENVELOPE_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    list.into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fetch the type catalogue into `session` and return the active types.
///
/// A failure is recorded on the session, which keeps its current
/// catalogue and reports [`MapSession::needs_catalogue`] until a later
/// call succeeds.
pub async fn load_catalogue<S>(
    session: &mut MapSession<S>,
    source: &dyn EntitySource,
) -> BTreeSet<String>
where
    S: MapSurface,
{
    match source.fetch_types().await {
        Ok(types) => {
            info!(source = source.name(), types = ?types, "Loaded type catalogue");
            session.set_known_types(types)
        }
        Err(e) => {
            session.apply_catalogue_error(&e);
            session.active_types()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityQuery, FetchError};
    use async_trait::async_trait;
    use ngsi_map::{Entity, MapConfig, MemorySurface, SessionStatus};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Catalogue that is unavailable for the first `outages` calls.
    struct FlakyCatalogue {
        outages: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntitySource for FlakyCatalogue {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn fetch_entities(&self, _query: &EntityQuery) -> Result<Vec<Entity>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_types(&self) -> Result<Vec<String>, FetchError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.outages {
                Err(FetchError::Status(503))
            } else {
                Ok(vec!["Station".to_string()])
            }
        }
    }

    #[tokio::test]
    async fn test_load_catalogue_recovers_after_outage() {
        let source = FlakyCatalogue {
            outages: 1,
            calls: AtomicUsize::new(0),
        };
        let mut session = MapSession::new(&MapConfig::default(), MemorySurface::new());

        let active = load_catalogue(&mut session, &source).await;
        assert!(active.is_empty());
        assert!(session.needs_catalogue());
        session.apply_entities(&[]);
        assert_eq!(
            session.status(),
            &SessionStatus::FetchFailed {
                message: "NGSI-LD error: 503".to_string()
            }
        );

        let active = load_catalogue(&mut session, &source).await;
        assert_eq!(active.into_iter().collect::<Vec<_>>(), vec!["Station"]);
        assert!(!session.needs_catalogue());
        assert_eq!(session.status(), &SessionStatus::Loading);
    }

    #[test]
    fn test_bare_array() {
        let types = normalize_type_list(&json!(["Station", "Sensor", "Station", "", 3, null]));
        assert_eq!(types, vec!["Sensor", "Station"]);
    }

    #[test]
    fn test_envelope_type_list() {
        let body = json!({
            "id": "urn:ngsi-ld:EntityTypeList:1",
            "type": "EntityTypeList",
            "typeList": ["WeatherObserved", "Accident"]
        });
        assert_eq!(normalize_type_list(&body), vec!["Accident", "WeatherObserved"]);
    }

    #[test]
    fn test_envelope_types_fallback() {
        let body = json!({ "types": ["B", "A"] });
        assert_eq!(normalize_type_list(&body), vec!["A", "B"]);
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(normalize_type_list(&json!({ "items": ["A"] })).is_empty());
        assert!(normalize_type_list(&json!("Station")).is_empty());
        assert!(normalize_type_list(&json!([])).is_empty());
    }
}
