// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    CrossMwmTransitions, EdgeEstimator, LatLon, NumMwmId, RoadGeometry, RoadGeometryProvider,
    RoadInfo, RoutingSettings, Segment, WeightKind, Weight, WorldGraph,
};

macro_rules! assert_almost_eq {
    ($left:expr, $right:expr) => {
        assert_almost_eq!($left, $right, 1e-6)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left;
        let right: f64 = $right;
        assert!(
            (left - right).abs() <= $epsilon * left.abs().max(right.abs()).max(1.0),
            "{} is not almost equal to {}",
            left,
            right
        );
    }};
}

/// Distance between neighboring points of synthetic roads, in degrees (about 111 m).
pub const STEP: f64 = 0.001;

pub fn point(lat: f64, lon: f64) -> LatLon {
    LatLon::new(lat * STEP, lon * STEP)
}

/// Road at 50 km/h through points given in [STEP]s.
pub fn road(points: &[(f64, f64)], bidirectional: bool) -> RoadInfo {
    road_at(points, bidirectional, 50.0)
}

pub fn road_at(points: &[(f64, f64)], bidirectional: bool, speed_kmph: f64) -> RoadInfo {
    RoadInfo::new(
        points.iter().map(|&(lat, lon)| point(lat, lon)).collect(),
        bidirectional,
        speed_kmph,
    )
}

pub fn estimator() -> EdgeEstimator {
    EdgeEstimator::new(WeightKind::Time, 100.0)
}

/// Default settings with a cross-border penalty of 60.
pub fn settings() -> RoutingSettings {
    RoutingSettings {
        cross_border_penalty: 60.0,
        ..RoutingSettings::default()
    }
}

pub fn world(geometry: RoadGeometry) -> WorldGraph {
    world_with(geometry, settings())
}

/// World over `geometry`, with transitions detected from shared points.
pub fn world_with(geometry: RoadGeometry, settings: RoutingSettings) -> WorldGraph {
    let transitions = Arc::new(CrossMwmTransitions::detect(&geometry));
    WorldGraph::new(Arc::new(geometry), transitions, estimator(), &settings)
}

/// Two regions with a bidirectional road each, meeting at (0, 0):
///
/// ```text
/// west 0: (0,-2) ── (0,-1) ── (0,0)
/// east 0:                     (0,0) ── (0,1) ── (0,2)
/// ```
pub fn two_regions(west: &str, east: &str) -> (RoadGeometry, NumMwmId, NumMwmId) {
    let mut g = RoadGeometry::default();
    let w = g.add_region(west);
    let e = g.add_region(east);
    g.add_road(w, road(&[(0.0, -2.0), (0.0, -1.0), (0.0, 0.0)], true));
    g.add_road(e, road(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)], true));
    (g, w, e)
}

/// Long road without any branches between two short roads:
///
/// ```text
/// 0: (0,-1) ── (0,0)
/// 1:           (0,0) ── (0,1) ── ... ── (0,n)
/// 2:                                    (0,n) ── (0,n+1)
/// ```
pub fn chain(n: u32) -> (RoadGeometry, NumMwmId) {
    let mut g = RoadGeometry::default();
    let m = g.add_region("Chain");
    let middle: Vec<(f64, f64)> = (0..=n).map(|i| (0.0, i as f64)).collect();
    let end = n as f64;
    g.add_road(m, road(&[(0.0, -1.0), (0.0, 0.0)], true));
    g.add_road(m, road(&middle, true));
    g.add_road(m, road(&[(0.0, end), (0.0, end + 1.0)], true));
    (g, m)
}

/// `size` × `size` grid: road `i` is row `i`, road `size + j` is column `j`.
/// Rows and columns have different speeds, and every third row is one-way.
pub fn grid(g: &mut RoadGeometry, mwm_id: NumMwmId, size: u32) {
    for i in 0..size {
        let row: Vec<(f64, f64)> = (0..size).map(|j| (i as f64, j as f64)).collect();
        g.add_road(mwm_id, road_at(&row, i % 3 != 1, 30.0 + 10.0 * (i % 4) as f64));
    }
    for j in 0..size {
        let column: Vec<(f64, f64)> = (0..size).map(|i| (i as f64, j as f64)).collect();
        g.add_road(mwm_id, road_at(&column, true, 40.0 + 15.0 * (j % 3) as f64));
    }
}

/// Every traversable segment of every region.
pub fn all_segments(geometry: &dyn RoadGeometryProvider) -> Vec<Segment> {
    let mut segments = Vec::new();
    for mwm_id in geometry.regions() {
        for feature_id in 0..geometry.road_count(mwm_id) {
            let Some(road) = geometry.road(mwm_id, feature_id) else {
                continue;
            };
            for idx in 0..road.segment_count() {
                for forward in [true, false] {
                    let s = Segment::new(mwm_id, feature_id, idx, forward);
                    if road.allows(&s) {
                        segments.push(s);
                    }
                }
            }
        }
    }
    segments
}

/// Checks that each segment ends where the next one starts.
pub fn assert_adjacent(world: &WorldGraph, segments: &[Segment]) {
    for pair in segments.windows(2) {
        let front = world.point(&pair[0], true).map(|p| p.grid_key());
        let back = world.point(&pair[1], false).map(|p| p.grid_key());
        assert!(front.is_some(), "unknown segment {}", pair[0]);
        assert_eq!(front, back, "{} is not followed by {}", pair[0], pair[1]);
    }
}

/// Cost of following `segments` after the first one: raw segment weights
/// plus cross-border penalties.
pub fn route_weight(world: &WorldGraph, segments: &[Segment]) -> Weight {
    segments
        .windows(2)
        .map(|pair| {
            world.calc_segment_weight(&pair[1])
                + world.cross_border_penalty(pair[0].mwm_id, pair[1].mwm_id)
        })
        .sum()
}

/// Plain Dijkstra over raw outgoing edges from `start`.
pub fn dijkstra(world: &mut WorldGraph, start: Segment) -> HashMap<Segment, Weight> {
    let mut settled: HashMap<Segment, Weight> = HashMap::new();
    let mut tentative: HashMap<Segment, Weight> = HashMap::from([(start, 0.0)]);
    let mut edges = Vec::new();

    loop {
        let Some((vertex, cost)) = tentative
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1).then(a.0.cmp(b.0)))
            .map(|(&v, &c)| (v, c))
        else {
            break;
        };

        tentative.remove(&vertex);
        settled.insert(vertex, cost);

        world.get_edge_list(&vertex, true, &mut edges);
        for edge in &edges {
            if settled.contains_key(&edge.target) {
                continue;
            }
            let candidate = cost + edge.weight;
            let known = tentative.entry(edge.target).or_insert(Weight::INFINITY);
            if candidate < *known {
                *known = candidate;
            }
        }
    }

    settled
}
