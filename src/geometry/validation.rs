use super::{Geometry, Position};

/// Minimum number of valid vertices for a renderable line.
const MIN_LINE_VERTICES: usize = 2;

/// Validates a single position.
///
/// Rules:
/// - Both axes must be finite
/// - `(0,0)` is the "no fix" sentinel and is rejected
pub fn is_valid_position(position: &Position) -> bool {
    position.lon.is_finite()
        && position.lat.is_finite()
        && !(position.lon == 0.0 && position.lat == 0.0)
}

/// Validates a geometry for rendering.
///
/// A line string is kept whole when at least two of its vertices pass
/// [`is_valid_position`]; invalid vertices are not stripped.
pub fn is_valid(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point(position) => is_valid_position(position),
        Geometry::LineString(path) => {
            path.iter().filter(|p| is_valid_position(p)).count() >= MIN_LINE_VERTICES
        }
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_valid_points() {
        assert!(is_valid(&Geometry::Point(Position::new(18.0649, 59.3326))));
        assert!(is_valid(&Geometry::Point(Position::new(0.0, 59.0))));
        assert!(is_valid(&Geometry::Point(Position::new(18.0, 0.0))));
        assert!(is_valid(&Geometry::Point(Position::new(-180.0, -90.0))));
    }

    #[test]
    fn test_invalid_points() {
        assert!(!is_valid(&Geometry::Point(Position::new(0.0, 0.0))));
        assert!(!is_valid(&Geometry::Point(Position::new(f64::NAN, 1.0))));
        assert!(!is_valid(&Geometry::Point(Position::new(1.0, f64::INFINITY))));
    }

    #[test]
    fn test_line_string_needs_two_valid_vertices() {
        let ok = Geometry::LineString(vec![
            Position::new(18.0, 59.0),
            Position::new(0.0, 0.0),
            Position::new(18.1, 59.1),
        ]);
        assert!(is_valid(&ok));

        let one_valid = Geometry::LineString(vec![
            Position::new(18.0, 59.0),
            Position::new(0.0, 0.0),
        ]);
        assert!(!is_valid(&one_valid));

        assert!(!is_valid(&Geometry::LineString(vec![])));
    }

    #[test]
    fn test_line_string_keeps_invalid_vertices() {
        let line = Geometry::LineString(vec![
            Position::new(18.0, 59.0),
            Position::new(0.0, 0.0),
            Position::new(18.1, 59.1),
        ]);
        assert!(is_valid(&line));
        assert_eq!(line.positions().len(), 3);
    }
}
