use super::*;
use crate::geometry::Position;
use serde_json::{json, Value};

fn entities(records: Value) -> Vec<Entity> {
    records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| Entity::from_json(r).unwrap())
        .collect()
}

fn point(lon: f64, lat: f64) -> Value {
    json!({ "type": "GeoProperty", "value": { "type": "Point", "coordinates": [lon, lat] } })
}

#[test]
fn test_station_example() {
    let input = entities(json!([
        {
            "id": "urn:ngsi-ld:Station:central",
            "type": "Station",
            "location": point(18.0649, 59.3326),
            "status": "active"
        },
        {
            "id": "urn:ngsi-ld:Station:zero",
            "type": "Station",
            "location": point(0.0, 0.0)
        }
    ]));

    let collection = transform(&input);
    assert_eq!(collection.len(), 1);

    let feature = &collection.features[0];
    assert_eq!(feature.id, "urn:ngsi-ld:Station:central");
    assert_eq!(feature.label, "central");
    assert_eq!(feature.status.as_deref(), Some("active"));
    assert_eq!(
        feature.geometry,
        Geometry::Point(Position::new(18.0649, 59.3326))
    );
}

#[test]
fn test_valid_entity_yields_exactly_one_feature() {
    for (lon, lat) in [(18.0649, 59.3326), (-0.1276, 51.5072), (0.0, 1.0), (1.0, 0.0)] {
        let input = entities(json!([{
            "id": "urn:ngsi-ld:Sensor:s",
            "type": "Sensor",
            "location": point(lon, lat)
        }]));
        let collection = transform(&input);
        assert_eq!(collection.len(), 1, "({}, {}) should be kept", lon, lat);
        assert_eq!(
            collection.features[0].geometry,
            Geometry::Point(Position::new(lon, lat))
        );
    }
}

#[test]
fn test_label_prefers_name_then_id_tail() {
    let input = entities(json!([
        {
            "id": "urn:ngsi-ld:Station:north",
            "type": "Station",
            "name": { "type": "Property", "value": "North" },
            "location": point(18.035, 59.357)
        },
        {
            "id": "urn:ngsi-ld:Station:south",
            "type": "Station",
            "name": { "type": "Property", "value": "" },
            "location": point(18.0, 59.2)
        },
        {
            "id": "plain-id",
            "type": "Station",
            "location": point(18.1, 59.2)
        },
        {
            "id": "urn:trailing:",
            "type": "Station",
            "location": point(18.2, 59.2)
        }
    ]));

    let out = transform(&input);
    let labels: Vec<&str> = out
        .features
        .iter()
        .map(|f| f.label.as_str())
        .collect();
    assert_eq!(labels, vec!["North", "south", "plain-id", "urn:trailing:"]);
}

#[test]
fn test_skips_malformed_without_blocking_batch() {
    let input = entities(json!([
        { "id": "urn:a", "type": "Station" },
        { "id": "urn:b", "type": "Station", "location": { "type": "GeoProperty", "value": { "type": "Polygon", "coordinates": [] } } },
        { "id": "urn:c", "type": "Station", "location": { "type": "GeoProperty", "value": { "type": "Point", "coordinates": ["x", "y"] } } },
        { "id": "urn:d", "type": "Station", "location": point(18.0, 59.0) },
        { "id": "urn:e", "type": "Route", "location": {
            "type": "GeoProperty",
            "value": { "type": "LineString", "coordinates": [[0.0, 0.0], [18.0, 59.0]] }
        } }
    ]));

    let collection = transform(&input);
    let ids: Vec<&str> = collection.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["urn:d"]);
}

#[test]
fn test_line_string_feature() {
    let input = entities(json!([{
        "id": "urn:ngsi-ld:Route:r1",
        "type": "Route",
        "location": {
            "type": "GeoProperty",
            "value": { "type": "LineString", "coordinates": [[18.0, 59.0], [0.0, 0.0], [18.1, 59.1]] }
        }
    }]));

    let collection = transform(&input);
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.features[0].geometry.positions().len(), 3);
}

#[test]
fn test_line_string_tolerates_corrupt_vertices() {
    let input = entities(json!([
        {
            "id": "urn:ngsi-ld:Route:r2",
            "type": "Route",
            "location": {
                "type": "GeoProperty",
                "value": { "type": "LineString", "coordinates": [[18.0, 59.0], [null, null], [18.1, 59.1]] }
            }
        },
        {
            "id": "urn:ngsi-ld:Route:r3",
            "type": "Route",
            "location": {
                "type": "GeoProperty",
                "value": { "type": "LineString", "coordinates": [[18.0, 59.0], ["a", "b"], [0.0, 0.0]] }
            }
        }
    ]));

    let collection = transform(&input);
    assert_eq!(collection.len(), 1);
    let feature = &collection.features[0];
    assert_eq!(feature.id, "urn:ngsi-ld:Route:r2");
    let path = feature.geometry.positions();
    assert_eq!(path.len(), 3);
    assert_eq!(path[0], Position::new(18.0, 59.0));
    assert!(path[1].lon.is_nan());
    assert_eq!(path[2], Position::new(18.1, 59.1));
}

#[test]
fn test_observed_at_and_attributes() {
    let input = entities(json!([{
        "id": "urn:ngsi-ld:WeatherObserved:w1",
        "type": "WeatherObserved",
        "temperature": { "type": "Property", "value": 4.5, "unitCode": "CEL" },
        "dateObserved": {
            "type": "Property",
            "value": { "@type": "DateTime", "@value": "1970-01-01T00:00:10Z" }
        },
        "location": point(18.0, 59.0)
    }]));

    let feature = &transform(&input).features[0];
    assert_eq!(feature.observed_at, Some(10_000));
    assert_eq!(feature.observed_raw.as_deref(), Some("1970-01-01T00:00:10Z"));
    assert_eq!(feature.attributes.len(), 2);
    assert_eq!(feature.attributes[0].key, "temperature");
    assert_eq!(feature.attributes[0].unit.as_deref(), Some("CEL"));
}

#[test]
fn test_transform_is_idempotent() {
    let input = entities(json!([
        { "id": "urn:ngsi-ld:Station:a", "type": "Station", "location": point(18.0, 59.0) },
        { "id": "urn:ngsi-ld:Sensor:b", "type": "Sensor", "location": point(18.1, 59.1),
          "status": { "type": "Property", "value": "maintenance" } }
    ]));
    assert_eq!(transform(&input), transform(&input));
}

#[test]
fn test_custom_rules() {
    let mut by_type = std::collections::BTreeMap::new();
    by_type.insert("Station".to_string(), vec!["lastSeen".to_string()]);
    let transformer =
        EntityTransformer::new(ObservedAtRules::default().with_overrides(&[], &by_type));

    let input = entities(json!([{
        "id": "urn:ngsi-ld:Station:a",
        "type": "Station",
        "lastSeen": "1970-01-01T00:00:05Z",
        "location": point(18.0, 59.0)
    }]));
    assert_eq!(transformer.transform(&input).features[0].observed_at, Some(5_000));
}

#[test]
fn test_feature_serializes_for_rendering() {
    let input = entities(json!([{
        "id": "urn:ngsi-ld:Station:central",
        "type": "Station",
        "status": "active",
        "dateObserved": "1970-01-01T00:00:01Z",
        "location": point(18.0649, 59.3326)
    }]));

    let value = serde_json::to_value(&transform(&input)).unwrap();
    let feature = &value["features"][0];
    assert_eq!(feature["type"], "Station");
    assert_eq!(feature["observedAt"], 1000);
    assert_eq!(feature["geometry"]["type"], "Point");
    assert!(feature.get("observed_raw").is_none());
}
