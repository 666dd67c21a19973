use crate::types::{EntityQuery, FetchError};
use async_trait::async_trait;
use futures::future::try_join_all;
use ngsi_map::Entity;
use std::collections::BTreeSet;
use tracing::debug;

/// Where entity records come from.
///
/// Implemented by the HTTP client and by the built-in fixture. Both must
/// yield the same record shape.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// Short identifier used in logs (e.g., "http", "fixture").
    fn name(&self) -> &str;

    /// Entities matching one query. Malformed records are skipped, not
    /// reported.
    async fn fetch_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, FetchError>;

    /// Deduplicated, sorted entity type names known to the source.
    async fn fetch_types(&self) -> Result<Vec<String>, FetchError>;
}

/// Fetch every type in `types` concurrently, one request per type, and
/// concatenate the results in type order.
///
/// An empty type set returns immediately without calling the source. The
/// first failing request fails the whole fetch.
pub async fn fetch_for_types(
    source: &dyn EntitySource,
    types: &BTreeSet<String>,
    limit: u32,
) -> Result<Vec<Entity>, FetchError> {
    if types.is_empty() {
        debug!(source = source.name(), "No active types, skipping fetch");
        return Ok(Vec::new());
    }

    let requests = types.iter().map(|entity_type| {
        let query = EntityQuery::for_type(entity_type, limit);
        async move { source.fetch_entities(&query).await }
    });
    let batches = try_join_all(requests).await?;

    let entities: Vec<Entity> = batches.into_iter().flatten().collect();
    debug!(
        source = source.name(),
        types = types.len(),
        entities = entities.len(),
        "Fetched entities"
    );
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl EntitySource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.entity_type.as_deref() == self.fail_on {
                return Err(FetchError::Status(500));
            }
            Ok(Vec::new())
        }

        async fn fetch_types(&self) -> Result<Vec<String>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn types(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_type_set_skips_source() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };
        let entities = fetch_for_types(&source, &BTreeSet::new(), 200).await.unwrap();
        assert!(entities.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_one_request_per_type() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail_on: None,
        };
        fetch_for_types(&source, &types(&["A", "B", "C"]), 200)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_any_failure_fails_fetch() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail_on: Some("B"),
        };
        let err = fetch_for_types(&source, &types(&["A", "B"]), 200)
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Status(500));
    }

    #[tokio::test]
    async fn test_results_concatenate_in_type_order() {
        let source = FixtureSource::new();
        let entities = fetch_for_types(&source, &types(&["Station", "Sensor"]), 200)
            .await
            .unwrap();
        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "urn:ngsi-ld:Sensor:beta",
                "urn:ngsi-ld:Station:central",
                "urn:ngsi-ld:Station:north"
            ]
        );
    }
}
