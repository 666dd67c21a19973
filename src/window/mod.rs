// Sliding time window over observation timestamps

use crate::transform::{Feature, FeatureCollection};
use serde::Serialize;

/// Inclusive time interval in epoch milliseconds.
///
/// `start <= end` always holds: constructors and setters clamp by swapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    /// Build a window from two bounds in any order.
    pub fn new(a: i64, b: i64) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn set_start(&mut self, start: i64) {
        *self = Self::new(start, self.end);
    }

    pub fn set_end(&mut self, end: i64) {
        *self = Self::new(self.start, end);
    }

    /// Features without a timestamp are always inside.
    pub fn contains(&self, feature: &Feature) -> bool {
        match feature.observed_at {
            None => true,
            Some(ts) => self.start <= ts && ts <= self.end,
        }
    }
}

/// Keep the features inside `window`; no window returns the input unchanged.
pub fn filter(features: &FeatureCollection, window: Option<&TimeWindow>) -> FeatureCollection {
    match window {
        None => features.clone(),
        Some(window) => features
            .iter()
            .filter(|f| window.contains(f))
            .cloned()
            .collect(),
    }
}

/// Earliest and latest observation timestamps in the collection.
pub fn observed_range(features: &FeatureCollection) -> Option<TimeWindow> {
    let mut stamps = features.iter().filter_map(|f| f.observed_at);
    let first = stamps.next()?;
    let (min, max) = stamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    Some(TimeWindow::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Position};

    fn feature(id: &str, observed_at: Option<i64>) -> Feature {
        Feature {
            id: id.to_string(),
            entity_type: "WeatherObserved".to_string(),
            label: id.to_string(),
            status: None,
            observed_at,
            observed_raw: None,
            geometry: Geometry::Point(Position::new(18.0, 59.0)),
            attributes: vec![],
        }
    }

    fn collection(stamps: &[Option<i64>]) -> FeatureCollection {
        stamps
            .iter()
            .enumerate()
            .map(|(i, ts)| feature(&format!("f{}", i), *ts))
            .collect()
    }

    fn ids(c: &FeatureCollection) -> Vec<Option<i64>> {
        c.iter().map(|f| f.observed_at).collect()
    }

    #[test]
    fn test_new_clamps_order() {
        let w = TimeWindow::new(20, 10);
        assert_eq!((w.start(), w.end()), (10, 20));
    }

    #[test]
    fn test_setters_keep_start_before_end() {
        let mut w = TimeWindow::new(10, 20);
        w.set_start(30);
        assert_eq!((w.start(), w.end()), (20, 30));
        w.set_end(5);
        assert_eq!((w.start(), w.end()), (5, 20));
    }

    #[test]
    fn test_inclusive_bounds() {
        let input = collection(&[Some(9), Some(10), Some(15), Some(20), Some(21)]);
        let out = filter(&input, Some(&TimeWindow::new(10, 20)));
        assert_eq!(ids(&out), vec![Some(10), Some(15), Some(20)]);
    }

    #[test]
    fn test_reversed_bounds_normalized() {
        let input = collection(&[Some(9), Some(10), Some(20), Some(21)]);
        let out = filter(&input, Some(&TimeWindow::new(20, 10)));
        assert_eq!(ids(&out), vec![Some(10), Some(20)]);
    }

    #[test]
    fn test_undated_features_always_pass() {
        let input = collection(&[None, Some(100), None]);
        let out = filter(&input, Some(&TimeWindow::new(0, 10)));
        assert_eq!(ids(&out), vec![None, None]);
    }

    #[test]
    fn test_no_window_is_identity() {
        let input = collection(&[Some(1), None, Some(1_000_000)]);
        assert_eq!(filter(&input, None), input);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let input = collection(&[Some(1), Some(12), None, Some(18), Some(40)]);
        let window = TimeWindow::new(10, 20);
        let once = filter(&input, Some(&window));
        let twice = filter(&once, Some(&window));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_observed_range() {
        let input = collection(&[None, Some(50), Some(10), Some(30)]);
        assert_eq!(observed_range(&input), Some(TimeWindow::new(10, 50)));
        assert_eq!(observed_range(&collection(&[None])), None);
    }
}
