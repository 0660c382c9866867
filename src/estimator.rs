// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, LatLon, RoadInfo, Segment, Weight};

const KMPH_TO_MPS: f64 = 1000.0 / 3600.0;

/// What an [EdgeEstimator] optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightKind {
    /// Weights are travel times in seconds.
    #[default]
    Time,

    /// Weights are lengths in meters; speeds only matter for road speed caps.
    Distance,
}

/// Converts geometry and speeds into weights.
///
/// Every road speed is capped at `max_speed_kmph`, and the heuristic divides crow-flies
/// distance by that same speed, which makes [EdgeEstimator::heuristic] a lower bound
/// of any sequence of [EdgeEstimator::segment_weight]s between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeEstimator {
    pub kind: WeightKind,
    pub max_speed_kmph: f64,
    pub offroad_speed_kmph: f64,
    pub leap_speed_kmph: f64,
}

impl EdgeEstimator {
    pub fn new(kind: WeightKind, max_speed_kmph: f64) -> Self {
        Self {
            kind,
            max_speed_kmph,
            offroad_speed_kmph: 5.0_f64.min(max_speed_kmph),
            leap_speed_kmph: (0.8 * max_speed_kmph).max(1.0).min(max_speed_kmph),
        }
    }

    /// Cost of travelling `distance` meters at `speed_kmph`.
    fn weight(&self, distance: f64, speed_kmph: f64) -> Weight {
        match self.kind {
            WeightKind::Time => distance / (speed_kmph.min(self.max_speed_kmph) * KMPH_TO_MPS),
            WeightKind::Distance => distance,
        }
    }

    /// Weight of one raw segment of the given road. Returns [Weight::INFINITY]
    /// for segments outside of the road's geometry.
    pub fn segment_weight(&self, road: &RoadInfo, segment: &Segment) -> Weight {
        match (road.point(segment.point_id(false)), road.point(segment.point_id(true))) {
            (Some(from), Some(to)) => self.weight(earth_distance(from, to), road.speed_kmph),
            _ => Weight::INFINITY,
        }
    }

    /// Lower bound of the cost of any road path between two points.
    pub fn heuristic(&self, from: LatLon, to: LatLon) -> Weight {
        self.weight(earth_distance(from, to), self.max_speed_kmph)
    }

    /// Rough estimate of crossing a region between two of its border points.
    pub fn leap_weight(&self, from: LatLon, to: LatLon) -> Weight {
        self.weight(earth_distance(from, to), self.leap_speed_kmph)
    }

    /// Cost of reaching a road from a point which is not exactly on it.
    pub fn offroad_weight(&self, from: LatLon, to: LatLon) -> Weight {
        self.weight(earth_distance(from, to), self.offroad_speed_kmph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_weight_in_seconds() {
        let e = EdgeEstimator::new(WeightKind::Time, 130.0);
        let road = RoadInfo::new(vec![LatLon::new(0.0, 0.0), LatLon::new(1.0, 0.0)], true, 36.0);
        let w = e.segment_weight(&road, &Segment::new(0, 0, 0, true));
        assert!((w - 111_195.08 / 10.0).abs() < 0.1, "got {w}");
        assert_eq!(w, e.segment_weight(&road, &Segment::new(0, 0, 0, false)));
        assert_eq!(e.segment_weight(&road, &Segment::new(0, 0, 1, true)), Weight::INFINITY);
    }

    #[test]
    fn road_speed_is_capped() {
        let e = EdgeEstimator::new(WeightKind::Time, 50.0);
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 0.01);
        let road = RoadInfo::new(vec![a, b], true, 200.0);
        let w = e.segment_weight(&road, &Segment::new(0, 0, 0, true));
        assert!((w - e.heuristic(a, b)).abs() < 1e-9);
    }

    #[test]
    fn heuristic_is_lower_bound() {
        let e = EdgeEstimator::new(WeightKind::Time, 90.0);
        let a = LatLon::new(50.0, 20.0);
        let b = LatLon::new(50.001, 20.002);
        let road = RoadInfo::new(vec![a, b], true, 30.0);
        let w = e.segment_weight(&road, &Segment::new(0, 0, 0, true));
        assert!(e.heuristic(a, b) <= w);
        assert!(e.heuristic(a, b) <= e.leap_weight(a, b));
        assert!(e.heuristic(a, b) <= e.offroad_weight(a, b));
    }

    #[test]
    fn distance_kind() {
        let e = EdgeEstimator::new(WeightKind::Distance, 90.0);
        let a = LatLon::new(0.0, 0.0);
        let b = LatLon::new(0.0, 0.001);
        assert_eq!(e.heuristic(a, b), earth_distance(a, b));
        assert_eq!(e.leap_weight(a, b), earth_distance(a, b));
    }
}
