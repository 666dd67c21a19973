use super::Position;
use serde::Serialize;

/// Axis-aligned geographic bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Degenerate bounds covering a single position.
    pub fn from_position(position: Position) -> Self {
        Self {
            south: position.lat,
            west: position.lon,
            north: position.lat,
            east: position.lon,
        }
    }

    /// Smallest bounds covering every position, or `None` for an empty input.
    pub fn from_positions<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        positions.into_iter().fold(None, |acc, p| match acc {
            None => Some(Self::from_position(*p)),
            Some(bounds) => Some(bounds.extend_position(*p)),
        })
    }

    pub fn extend_position(self, position: Position) -> Self {
        Self {
            south: self.south.min(position.lat),
            west: self.west.min(position.lon),
            north: self.north.max(position.lat),
            east: self.east.max(position.lon),
        }
    }

    pub fn union(self, other: Bounds) -> Self {
        Self {
            south: self.south.min(other.south),
            west: self.west.min(other.west),
            north: self.north.max(other.north),
            east: self.east.max(other.east),
        }
    }

    /// Grow every side by `ratio` of the current span.
    pub fn pad(self, ratio: f64) -> Self {
        let lat_pad = (self.north - self.south).abs() * ratio;
        let lon_pad = (self.east - self.west).abs() * ratio;
        Self {
            south: self.south - lat_pad,
            west: self.west - lon_pad,
            north: self.north + lat_pad,
            east: self.east + lon_pad,
        }
    }

    pub fn center(&self) -> Position {
        Position::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    pub fn is_valid(&self) -> bool {
        [self.south, self.west, self.north, self.east]
            .iter()
            .all(|v| v.is_finite())
            && self.south <= self.north
            && self.west <= self.east
    }
}
