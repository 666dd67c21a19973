// Geometry model, validation and bounds

mod bounds;
mod validation;

pub use bounds::Bounds;
pub use validation::{is_valid, is_valid_position};

use serde::{Deserialize, Serialize};

/// A WGS84 position in GeoJSON axis order (longitude first).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Build a position from a GeoJSON coordinate array. Extra members
    /// (altitude) are ignored; fewer than two members yields `None`.
    pub fn from_coordinates(coordinates: &[f64]) -> Option<Self> {
        match coordinates {
            [lon, lat, ..] => Some(Self::new(*lon, *lat)),
            _ => None,
        }
    }
}

impl From<[f64; 2]> for Position {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self::new(lon, lat)
    }
}

impl From<Position> for [f64; 2] {
    fn from(position: Position) -> Self {
        [position.lon, position.lat]
    }
}

/// Supported GeoJSON geometries.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
}

/// Wire shape of a GeoJSON geometry, before axis arrays are turned into
/// positions.
#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Vec<f64> },
    LineString { coordinates: Vec<serde_json::Value> },
}

/// Decode one line vertex; unusable entries become a NaN position that
/// [`is_valid_position`] rejects, so the line keeps its shape.
fn line_vertex(value: &serde_json::Value) -> Position {
    let axes: Option<Vec<f64>> = value
        .as_array()
        .and_then(|axes| axes.iter().map(serde_json::Value::as_f64).collect());
    axes.as_deref()
        .and_then(Position::from_coordinates)
        .unwrap_or(Position::new(f64::NAN, f64::NAN))
}

impl Geometry {
    /// Decode a GeoJSON geometry object.
    ///
    /// Returns `None` for unsupported geometry types and for point
    /// coordinates that are too short to hold a position. A line keeps
    /// every vertex, corrupt ones included; validity (finite, not the
    /// `(0,0)` sentinel) is checked separately by [`is_valid`].
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let raw: RawGeometry = serde_json::from_value(value.clone()).ok()?;
        match raw {
            RawGeometry::Point { coordinates } => {
                Position::from_coordinates(&coordinates).map(Geometry::Point)
            }
            RawGeometry::LineString { coordinates } => Some(Geometry::LineString(
                coordinates.iter().map(line_vertex).collect(),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
        }
    }

    /// All positions of the geometry, in order.
    pub fn positions(&self) -> &[Position] {
        match self {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::LineString(path) => path,
        }
    }
}
