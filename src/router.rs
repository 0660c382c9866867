// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::astar::{find_path, find_path_bidirectional, Params, RoutingResult};
use crate::kd::RoadIndex;
use crate::{
    AStarError, AStarGraph, AStarProgress, Cancellable, JointGraphStarter, JointSegment, LatLon,
    LeapVertex, NumMwmId, RegionsSparseGraph, RoutingSettings, Segment, Weight, WorldGraph,
};

/// Why a [Router] couldn't produce a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// The end is unreachable from the start, or the search gave up after
    /// exceeding its step limit.
    #[error("route not found")]
    NotFound,

    /// The [Cancellable] of the search was triggered.
    #[error("route search cancelled")]
    Cancelled,

    /// Invalid input or broken internal state. Details are logged.
    #[error("internal routing error")]
    InternalError,
}

/// Route over raw segments, from the start segment to the end segment (both included).
///
/// The weight doesn't include the start segment, unless the route was requested
/// between two positions, in which case it covers everything from the first
/// position to the second one. Positions resolving to the same road point
/// are connected by a route without any segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub segments: Vec<Segment>,
    pub weight: Weight,
}

impl Route {
    /// Polyline of the route: the back point of the first segment followed
    /// by front points of all segments.
    pub fn points(&self, world: &WorldGraph) -> Vec<LatLon> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            points.extend(world.point(first, false));
        }
        points.extend(self.segments.iter().filter_map(|s| world.point(s, true)));
        points
    }
}

/// Finds routes over a [WorldGraph], following [RoutingSettings].
pub struct Router {
    world: WorldGraph,
    settings: RoutingSettings,
}

impl Router {
    pub fn new(mut world: WorldGraph, settings: RoutingSettings) -> Self {
        world.set_mode(settings.mode);
        Self { world, settings }
    }

    pub fn world(&self) -> &WorldGraph {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldGraph {
        &mut self.world
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// Finds the cheapest route from the `start` segment to the `end` segment.
    pub fn find_path(
        &mut self,
        start: Segment,
        end: Segment,
        cancellable: &Cancellable,
    ) -> Result<Route, FailureReason> {
        self.find_path_impl(start, end, cancellable, None)
    }

    /// Like [Router::find_path], but calls `callback` with the approximate completion
    /// percentage whenever it increases.
    pub fn find_path_with_progress<F: FnMut(f64) + Send + 'static>(
        &mut self,
        start: Segment,
        end: Segment,
        cancellable: &Cancellable,
        callback: F,
    ) -> Result<Route, FailureReason> {
        let (Some(from), Some(to)) = (self.world.point(&start, true), self.world.point(&end, true))
        else {
            log::error!("route endings {} and {} must be known segments", start, end);
            return Err(FailureReason::InternalError);
        };

        let mut progress = AStarProgress::new(from, to).with_callback(callback);
        let route = self.find_path_impl(start, end, cancellable, Some(&mut progress))?;
        progress.finish();
        Ok(route)
    }

    fn find_path_impl(
        &mut self,
        start: Segment,
        end: Segment,
        cancellable: &Cancellable,
        mut progress: Option<&mut AStarProgress>,
    ) -> Result<Route, FailureReason> {
        for segment in [&start, &end] {
            if !self.world.is_valid_segment(segment) {
                log::error!("{} is not a traversable segment", segment);
                return Err(FailureReason::InternalError);
            }
        }

        if start == end {
            return Ok(Route {
                segments: vec![start],
                weight: 0.0,
            });
        }

        if let Some(regions) = self.find_region_chain(start, end, cancellable)? {
            let regions_list: Vec<NumMwmId> = regions.iter().copied().collect();
            self.world.prewarm(&regions_list);
            self.world.set_allowed_regions(Some(regions));

            let result = self.search(start, end, cancellable, progress.as_deref_mut());
            self.world.set_allowed_regions(None);

            match result {
                Err(FailureReason::NotFound) => {
                    log::info!("no route within the leap region chain, retrying without it")
                }
                other => return other,
            }
        }

        self.search(start, end, cancellable, progress)
    }

    /// Runs the leap pre-pass, if enabled and applicable. Returns the regions
    /// a detailed search should be limited to.
    fn find_region_chain(
        &self,
        start: Segment,
        end: Segment,
        cancellable: &Cancellable,
    ) -> Result<Option<HashSet<NumMwmId>>, FailureReason> {
        if !self.settings.use_leaps || !self.settings.mode.crosses_borders() || start.mwm_id == end.mwm_id {
            return Ok(None);
        }
        let Some(cross_border) = self.world.cross_border_graph() else {
            return Ok(None);
        };
        let (Some(from), Some(to)) = (self.world.point(&start, true), self.world.point(&end, true)) else {
            return Ok(None);
        };

        let mut graph = RegionsSparseGraph::new(cross_border, &self.world, (from, start.mwm_id), (to, end.mwm_id));
        let mut params = Params::new(LeapVertex::Start, LeapVertex::Finish, cancellable);
        params.step_limit = self.settings.step_limit;
        params.weight_epsilon = self.settings.weight_epsilon;

        match find_path(&mut graph, params) {
            Ok(result) => {
                let regions = graph.regions_of(&result.path);
                log::debug!(
                    "leap pre-pass: {} crossings over {} regions",
                    result.path.len().saturating_sub(2),
                    regions.len()
                );
                Ok(Some(regions))
            }
            Err(AStarError::Cancelled) => {
                log::info!("route search cancelled during the leap pre-pass");
                Err(FailureReason::Cancelled)
            }
            Err(e) => {
                log::debug!("leap pre-pass failed ({}), searching without a region chain", e);
                Ok(None)
            }
        }
    }

    /// Detailed search in the current [WorldGraph] mode.
    fn search(
        &mut self,
        start: Segment,
        end: Segment,
        cancellable: &Cancellable,
        progress: Option<&mut AStarProgress>,
    ) -> Result<Route, FailureReason> {
        let settings = self.settings;

        let (segments, weight) = if settings.mode.uses_joints() {
            let mut starter = JointGraphStarter::new(&mut self.world).with_wave_window(settings.wave_window);
            starter
                .init(start, end)
                .map_err(|_| FailureReason::InternalError)?;

            let result = run(
                &mut starter,
                JointSegment::START,
                JointSegment::END,
                &settings,
                cancellable,
                progress,
            )?;
            let segments = starter
                .reconstruct_route(&result.path)
                .map_err(|_| FailureReason::InternalError)?;
            (segments, result.distance)
        } else {
            let result = run(&mut self.world, start, end, &settings, cancellable, progress)?;
            (result.path, result.distance)
        };

        if segments.first() != Some(&start) || segments.last() != Some(&end) {
            log::error!("reconstructed route doesn't go from {} to {}", start, end);
            debug_assert!(false, "reconstructed route doesn't go from {} to {}", start, end);
            return Err(FailureReason::InternalError);
        }

        log::info!(
            "found route from {} to {}: {} segments, weight {:.1}",
            start,
            end,
            segments.len(),
            weight
        );
        Ok(Route { segments, weight })
    }

    /// Finds the cheapest route between two positions, resolved to their nearest road points.
    ///
    /// Every segment leaving the start point and every segment arriving at the end point
    /// is tried. The weight includes off-road connectors between the positions and the
    /// road points, and the first segment of the route. If both positions resolve to the
    /// same road point, the route has no segments and only the connectors are weighed.
    pub fn find_route_between_points(
        &mut self,
        index: &RoadIndex,
        from: LatLon,
        to: LatLon,
        cancellable: &Cancellable,
    ) -> Result<Route, FailureReason> {
        let (from_road, starts) = index.candidates(self.world.geometry(), from, true);
        let (to_road, ends) = index.candidates(self.world.geometry(), to, false);
        let connectors =
            self.world.calc_offroad_weight(from, from_road) + self.world.calc_offroad_weight(to_road, to);

        if from_road.grid_key() == to_road.grid_key() {
            return Ok(Route {
                segments: Vec::new(),
                weight: connectors,
            });
        }

        let mut best: Option<Route> = None;
        for &start in &starts {
            for &end in &ends {
                let mut route = match self.find_path(start, end, cancellable) {
                    Ok(route) => route,
                    Err(FailureReason::NotFound) => continue,
                    Err(e) => return Err(e),
                };
                route.weight += connectors + self.world.calc_segment_weight(&start);

                if best.as_ref().map_or(true, |b| route.weight < b.weight) {
                    best = Some(route);
                }
            }
        }

        best.ok_or_else(|| {
            log::info!("no route between {} and {}", from, to);
            FailureReason::NotFound
        })
    }

    /// Finds a route visiting all `waypoints` in order, as a concatenation of
    /// [Router::find_route_between_points] legs.
    pub fn find_route_through(
        &mut self,
        index: &RoadIndex,
        waypoints: &[LatLon],
        cancellable: &Cancellable,
    ) -> Result<Route, FailureReason> {
        if waypoints.len() < 2 {
            log::error!("a route needs at least 2 waypoints, got {}", waypoints.len());
            return Err(FailureReason::InternalError);
        }

        let mut route = Route {
            segments: Vec::new(),
            weight: 0.0,
        };

        for leg in waypoints.windows(2) {
            let leg = self.find_route_between_points(index, leg[0], leg[1], cancellable)?;
            let skip = usize::from(route.segments.last().is_some() && route.segments.last() == leg.segments.first());
            route.segments.extend_from_slice(&leg.segments[skip..]);
            route.weight += leg.weight;
        }

        Ok(route)
    }
}

/// Runs the search algorithm selected by `settings` over a graph.
fn run<G: AStarGraph>(
    graph: &mut G,
    start: G::Vertex,
    finish: G::Vertex,
    settings: &RoutingSettings,
    cancellable: &Cancellable,
    progress: Option<&mut AStarProgress>,
) -> Result<RoutingResult<G::Vertex>, FailureReason> {
    let mut params = Params::new(start, finish, cancellable);
    params.step_limit = settings.step_limit;
    params.weight_epsilon = settings.weight_epsilon;
    params.progress = progress;

    let result = if settings.bidirectional {
        find_path_bidirectional(graph, params)
    } else {
        find_path(graph, params)
    };

    result.map_err(|e| match e {
        AStarError::NoPath => {
            log::info!("no route from {:?} to {:?}", start, finish);
            FailureReason::NotFound
        }
        AStarError::StepLimitExceeded => {
            log::warn!("route search from {:?} to {:?} exceeded its step limit", start, finish);
            FailureReason::NotFound
        }
        AStarError::Cancelled => {
            log::info!("route search cancelled");
            FailureReason::Cancelled
        }
        AStarError::Invariant(e) => {
            log::error!("route search failed: {}", e);
            FailureReason::InternalError
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::test_fixtures::{
        all_segments, assert_adjacent, chain, dijkstra, grid, point, road, road_at, route_weight,
        settings, two_regions, world_with,
    };
    use crate::{
        CrossBorderGraph, CrossBorderSegment, CrossBorderSegmentEnding, RoadGeometry, Restriction,
        WorldGraphMode,
    };

    fn router(g: RoadGeometry, settings: RoutingSettings) -> Router {
        Router::new(world_with(g, settings), settings)
    }

    fn all_settings() -> Vec<RoutingSettings> {
        let mut all = Vec::new();
        for mode in [
            WorldGraphMode::Joints,
            WorldGraphMode::JointSingleMwm,
            WorldGraphMode::NoLeaps,
            WorldGraphMode::SingleMwm,
        ] {
            for bidirectional in [true, false] {
                all.push(RoutingSettings {
                    mode,
                    bidirectional,
                    ..settings()
                });
            }
        }
        all
    }

    /// Compares routes in every mode with a plain Dijkstra over raw segments.
    fn check_against_dijkstra(g: RoadGeometry, settings: RoutingSettings, stride: (usize, usize)) {
        let segments = all_segments(&g);
        let mut r = router(g, settings);
        let c = Cancellable::default();

        for &start in segments.iter().step_by(stride.0) {
            let expected: HashMap<Segment, Weight> = dijkstra(r.world_mut(), start);

            for &end in segments.iter().step_by(stride.1) {
                let result = r.find_path(start, end, &c);
                let Some(&distance) = expected.get(&end) else {
                    assert_eq!(result, Err(FailureReason::NotFound), "{} -> {}", start, end);
                    continue;
                };

                let route = result.unwrap_or_else(|e| panic!("{} -> {}: {}", start, end, e));
                assert_eq!(route.segments.first(), Some(&start));
                assert_eq!(route.segments.last(), Some(&end));
                assert_adjacent(r.world(), &route.segments);
                assert_almost_eq!(route.weight, distance);
                assert_almost_eq!(route_weight(r.world(), &route.segments), route.weight);
            }
        }
    }

    #[test]
    fn diamond_prefers_cheaper_branch() {
        // S: (0,-1) ── (0,0)
        // A: (0,0) ── (1,1) ── (0,2), fast
        // B: (0,0) ── (-1,1) ── (0,2), slow
        // E: (0,2) ── (0,3)
        let mut g = RoadGeometry::default();
        let m = g.add_region("Diamond");
        g.add_road(m, road(&[(0.0, -1.0), (0.0, 0.0)], true));
        g.add_road(m, road_at(&[(0.0, 0.0), (1.0, 1.0), (0.0, 2.0)], true, 90.0));
        g.add_road(m, road_at(&[(0.0, 0.0), (-1.0, 1.0), (0.0, 2.0)], true, 20.0));
        g.add_road(m, road(&[(0.0, 2.0), (0.0, 3.0)], true));

        for s in all_settings() {
            let mut r = router(g.clone(), s);
            let route = r
                .find_path(Segment::new(m, 0, 0, true), Segment::new(m, 3, 0, true), &Cancellable::default())
                .unwrap();
            assert_eq!(
                route.segments,
                vec![
                    Segment::new(m, 0, 0, true),
                    Segment::new(m, 1, 0, true),
                    Segment::new(m, 1, 1, true),
                    Segment::new(m, 3, 0, true),
                ],
                "{:?}",
                s
            );
        }
    }

    #[test]
    fn grid_matches_dijkstra() {
        for s in all_settings() {
            let mut g = RoadGeometry::default();
            let m = g.add_region("Grid");
            grid(&mut g, m, 5);
            check_against_dijkstra(g, s, (5, 7));
        }
    }

    #[test]
    fn chain_matches_dijkstra() {
        for s in all_settings() {
            let (g, _) = chain(6);
            check_against_dijkstra(g, s, (1, 1));
        }
    }

    #[test]
    fn long_searches_match_dijkstra() {
        // Large enough for the bidirectional search to switch waves many times, with
        // the ends inside a road of another region and in the middle of a grid column.
        let mut g = RoadGeometry::default();
        let m = g.add_region("Grid");
        grid(&mut g, m, 30);
        let tail = g.add_region("Tail");
        let points: Vec<(f64, f64)> = (29..=48).map(|j| (29.0, j as f64)).collect();
        g.add_road(tail, road(&points, true));

        let start = Segment::new(m, 0, 0, true);
        let ends = [
            Segment::new(tail, 0, 2, true),
            Segment::new(tail, 0, 15, true),
            Segment::new(m, 45, 20, true),
            Segment::new(m, 59, 27, false),
        ];

        let expected = dijkstra(&mut world_with(g.clone(), settings()), start);
        let c = Cancellable::default();

        for mode in [WorldGraphMode::Joints, WorldGraphMode::NoLeaps] {
            for bidirectional in [true, false] {
                let s = RoutingSettings {
                    mode,
                    bidirectional,
                    ..settings()
                };
                let mut r = router(g.clone(), s);

                for end in ends {
                    let route = r
                        .find_path(start, end, &c)
                        .unwrap_or_else(|e| panic!("{:?} {} -> {}: {}", s, start, end, e));
                    assert_eq!(route.segments.first(), Some(&start));
                    assert_eq!(route.segments.last(), Some(&end));
                    assert_adjacent(r.world(), &route.segments);
                    assert_almost_eq!(route.weight, expected[&end]);
                    assert_almost_eq!(route_weight(r.world(), &route.segments), route.weight);
                }
            }
        }
    }

    #[test]
    fn heuristic_is_admissible() {
        let mut g = RoadGeometry::default();
        let m = g.add_region("Grid");
        grid(&mut g, m, 4);
        let segments = all_segments(&g);
        let mut r = router(g, settings());

        for &start in &segments {
            for (end, distance) in dijkstra(r.world_mut(), start) {
                let h = r.world().heuristic_cost_estimate(&start, &end);
                assert!(h <= distance + 1e-9, "{} -> {}: {} > {}", start, end, h, distance);
            }
        }
    }

    #[test]
    fn chain_weight_is_sum_of_segments() {
        let (g, m) = chain(10);
        let mut r = router(g, settings());
        let start = Segment::new(m, 0, 0, true);
        let end = Segment::new(m, 2, 0, true);
        let route = r.find_path(start, end, &Cancellable::default()).unwrap();

        assert_eq!(route.segments.len(), 12);
        let expected: Weight = route.segments[1..]
            .iter()
            .map(|s| r.world().calc_segment_weight(s))
            .sum();
        assert_almost_eq!(route.weight, expected);
    }

    /// ```text
    ///           (3,0)
    ///             │ 1
    ///           (2,0) ── 4 ── (2,2)
    ///             │ 1           │ 3
    /// (0,-2) ── (0,0) ── 2 ── (0,2)
    ///       0
    /// ```
    fn three_way_intersection() -> (RoadGeometry, NumMwmId) {
        let mut g = RoadGeometry::default();
        let m = g.add_region("Intersection");
        g.add_road(m, road(&[(0.0, -2.0), (0.0, -1.0), (0.0, 0.0)], true));
        g.add_road(m, road(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)], true));
        g.add_road(m, road(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)], true));
        g.add_road(m, road(&[(0.0, 2.0), (2.0, 2.0)], true));
        g.add_road(m, road(&[(2.0, 2.0), (2.0, 0.0)], true));
        (g, m)
    }

    #[test]
    fn restriction_is_enforced() {
        let (mut g, m) = three_way_intersection();
        let start = Segment::new(m, 0, 1, true);
        let end = Segment::new(m, 1, 2, true);

        let free = router(g.clone(), settings())
            .find_path(start, end, &Cancellable::default())
            .unwrap();
        assert_eq!(free.segments.len(), 4);
        assert_eq!(free.segments[1], Segment::new(m, 1, 0, true));

        g.add_restriction(m, Restriction::no(0, 1));
        for s in all_settings() {
            let route = router(g.clone(), s)
                .find_path(start, end, &Cancellable::default())
                .unwrap();
            assert!(
                route
                    .segments
                    .windows(2)
                    .all(|pair| !(pair[0].feature_id == 0 && pair[1].feature_id == 1)),
                "{:?}: restricted turn taken in {:?}",
                s,
                route.segments
            );
            assert!(route.weight > free.weight);
        }

        check_against_dijkstra(g, settings(), (2, 3));
    }

    #[test]
    fn pre_cancelled() {
        let (g, m) = chain(4);
        let c = Cancellable::default();
        c.cancel();
        for s in all_settings() {
            let mut r = router(g.clone(), s);
            let result = r.find_path(Segment::new(m, 0, 0, true), Segment::new(m, 2, 0, true), &c);
            assert_eq!(result, Err(FailureReason::Cancelled), "{:?}", s);
        }
    }

    #[test]
    fn start_is_end() {
        let (g, m) = chain(2);
        let s = Segment::new(m, 1, 1, false);
        let route = router(g, settings())
            .find_path(s, s, &Cancellable::default())
            .unwrap();
        assert_eq!(route.segments, vec![s]);
        assert_eq!(route.weight, 0.0);
    }

    #[test]
    fn invalid_segments() {
        let (mut g, m) = chain(2);
        g.add_road(m, road(&[(5.0, 0.0), (5.0, 1.0)], false));
        let mut r = router(g, settings());
        let c = Cancellable::default();
        let valid = Segment::new(m, 0, 0, true);

        for invalid in [
            Segment::new(m, 1, 7, true),
            Segment::new(m, 42, 0, true),
            Segment::new(m + 1, 0, 0, true),
            Segment::new(m, 3, 0, false),
        ] {
            assert_eq!(r.find_path(valid, invalid, &c), Err(FailureReason::InternalError));
            assert_eq!(r.find_path(invalid, valid, &c), Err(FailureReason::InternalError));
        }
    }

    #[test]
    fn disconnected() {
        let (mut g, m) = chain(2);
        g.add_road(m, road(&[(5.0, 0.0), (5.0, 1.0)], true));
        for s in all_settings() {
            let mut r = router(g.clone(), s);
            let result = r.find_path(Segment::new(m, 0, 0, true), Segment::new(m, 3, 0, true), &Cancellable::default());
            assert_eq!(result, Err(FailureReason::NotFound), "{:?}", s);
        }
    }

    #[test]
    fn step_limit_means_not_found() {
        let (g, m) = chain(30);
        let s = RoutingSettings {
            step_limit: 2,
            mode: WorldGraphMode::NoLeaps,
            ..settings()
        };
        let result = router(g, s).find_path(
            Segment::new(m, 0, 0, true),
            Segment::new(m, 2, 0, true),
            &Cancellable::default(),
        );
        assert_eq!(result, Err(FailureReason::NotFound));
    }

    #[test]
    fn cross_border_penalty() {
        let start_end = |w: NumMwmId, e: NumMwmId| (Segment::new(w, 0, 0, true), Segment::new(e, 0, 1, true));

        let (g, w, e) = two_regions("Poland", "Germany");
        let mut r = router(g, settings());
        let (start, end) = start_end(w, e);
        let route = r.find_path(start, end, &Cancellable::default()).unwrap();
        assert_eq!(
            route.segments,
            vec![
                start,
                Segment::new(w, 0, 1, true),
                Segment::new(e, 0, 0, true),
                end,
            ]
        );
        assert_adjacent(r.world(), &route.segments);
        let roads: Weight = route.segments[1..]
            .iter()
            .map(|s| r.world().calc_segment_weight(s))
            .sum();
        assert_almost_eq!(route.weight, roads + 60.0);

        let (g, w, e) = two_regions("Germany_West", "Germany_East");
        let mut r = router(g, settings());
        let (start, end) = start_end(w, e);
        let route = r.find_path(start, end, &Cancellable::default()).unwrap();
        assert_almost_eq!(route.weight, roads);
    }

    #[test]
    fn single_region_modes_stop_at_borders() {
        let (g, w, e) = two_regions("Poland", "Germany");
        for mode in [WorldGraphMode::SingleMwm, WorldGraphMode::JointSingleMwm] {
            let s = RoutingSettings { mode, ..settings() };
            let result = router(g.clone(), s).find_path(
                Segment::new(w, 0, 0, true),
                Segment::new(e, 0, 1, true),
                &Cancellable::default(),
            );
            assert_eq!(result, Err(FailureReason::NotFound), "{:?}", mode);
        }
    }

    #[test]
    fn two_regions_match_dijkstra() {
        let (g, _, _) = two_regions("Poland", "Germany");
        for s in all_settings().into_iter().filter(|s| s.mode.crosses_borders()) {
            check_against_dijkstra(g.clone(), s, (1, 1));
        }
    }

    /// `Poland` ─ `Germany_North` ─ `Germany_South` in a row, with `Austria`
    /// hanging off `Germany_North`.
    fn regions_with_branch() -> (RoadGeometry, [NumMwmId; 4]) {
        let mut g = RoadGeometry::default();
        let a = g.add_region("Poland");
        let b = g.add_region("Germany_North");
        let c = g.add_region("Germany_South");
        let d = g.add_region("Austria");
        g.add_road(a, road(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)], true));
        g.add_road(b, road(&[(0.0, 2.0), (0.0, 3.0), (0.0, 4.0)], true));
        g.add_road(b, road(&[(0.0, 3.0), (1.0, 3.0)], true));
        g.add_road(c, road(&[(0.0, 4.0), (0.0, 5.0), (0.0, 6.0)], true));
        g.add_road(d, road(&[(1.0, 3.0), (2.0, 3.0)], true));
        (g, [a, b, c, d])
    }

    #[test]
    fn leaps_limit_loaded_regions() {
        let (g, [a, b, c, d]) = regions_with_branch();
        let world = world_with(g, settings());
        let cross_border = Arc::new(CrossBorderGraph::build(&world));
        let mut r = Router::new(world.with_cross_border_graph(cross_border), settings());

        let route = r
            .find_path(Segment::new(a, 0, 0, true), Segment::new(c, 0, 1, true), &Cancellable::default())
            .unwrap();
        assert_eq!(route.segments.len(), 6);
        assert_adjacent(r.world(), &route.segments);
        assert_eq!(r.world().loaded_regions(), vec![a, b, c]);
        assert!(!r.world().loaded_regions().contains(&d));
    }

    #[test]
    fn leaps_fall_back_to_full_search() {
        let (g, [a, b, c, _]) = regions_with_branch();
        let world = world_with(g, settings());

        // Claims a direct, but nonexistent, crossing from Poland to Germany_South
        let mut cross_border = CrossBorderGraph::default();
        cross_border.add_segment(
            0,
            CrossBorderSegment {
                start: CrossBorderSegmentEnding::new(point(0.0, 2.0), a),
                end: CrossBorderSegmentEnding::new(point(0.0, 4.0), c),
                weight: 1.0,
            },
        );
        let mut r = Router::new(world.with_cross_border_graph(Arc::new(cross_border)), settings());

        let route = r
            .find_path(Segment::new(a, 0, 0, true), Segment::new(c, 0, 1, true), &Cancellable::default())
            .unwrap();
        assert!(route.segments.iter().any(|s| s.mwm_id == b));
        assert_adjacent(r.world(), &route.segments);

        let no_leaps = RoutingSettings {
            use_leaps: false,
            ..settings()
        };
        let (g, _) = regions_with_branch();
        let expected = router(g, no_leaps)
            .find_path(Segment::new(a, 0, 0, true), Segment::new(c, 0, 1, true), &Cancellable::default())
            .unwrap();
        assert_eq!(route.segments, expected.segments);
        assert_almost_eq!(route.weight, expected.weight);
    }

    #[test]
    fn progress_reaches_100() {
        let (g, m) = chain(20);
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = reported.clone();

        let route = router(g, settings()).find_path_with_progress(
            Segment::new(m, 0, 0, true),
            Segment::new(m, 2, 0, true),
            &Cancellable::default(),
            move |percent| sink.lock().unwrap().push(percent),
        );
        assert!(route.is_ok());

        let reported = reported.lock().unwrap();
        assert_eq!(reported.last(), Some(&100.0));
        assert!(reported.windows(2).all(|w| w[0] < w[1]));
        assert!(reported[..reported.len() - 1].iter().all(|&p| p <= 99.0));
    }

    #[test]
    fn route_points() {
        let (g, m) = chain(2);
        let mut r = router(g, settings());
        let route = r
            .find_path(Segment::new(m, 0, 0, true), Segment::new(m, 1, 1, true), &Cancellable::default())
            .unwrap();
        assert_eq!(
            route.points(r.world()),
            vec![point(0.0, -1.0), point(0.0, 0.0), point(0.0, 1.0), point(0.0, 2.0)]
        );
    }

    /// Single bidirectional road (0,0) ── (0,1) ── ... ── (0,6).
    fn straight_road() -> (RoadGeometry, NumMwmId) {
        let mut g = RoadGeometry::default();
        let m = g.add_region("Straight");
        let points: Vec<(f64, f64)> = (0..=6).map(|i| (0.0, i as f64)).collect();
        g.add_road(m, road(&points, true));
        (g, m)
    }

    #[test]
    fn between_points() {
        let (g, m) = straight_road();
        let index = RoadIndex::build(&g).unwrap();
        let mut r = router(g, settings());

        let from = point(0.1, 1.0);
        let to = point(-0.1, 4.0);
        let route = r
            .find_route_between_points(&index, from, to, &Cancellable::default())
            .unwrap();
        assert_eq!(
            route.segments,
            vec![
                Segment::new(m, 0, 1, true),
                Segment::new(m, 0, 2, true),
                Segment::new(m, 0, 3, true),
            ]
        );

        let w = r.world();
        let expected = w.calc_offroad_weight(from, point(0.0, 1.0))
            + route.segments.iter().map(|s| w.calc_segment_weight(s)).sum::<Weight>()
            + w.calc_offroad_weight(point(0.0, 4.0), to);
        assert_almost_eq!(route.weight, expected);

        let back = r
            .find_route_between_points(&index, to, from, &Cancellable::default())
            .unwrap();
        assert_eq!(back.segments.first(), Some(&Segment::new(m, 0, 3, false)));
        assert_eq!(back.segments.last(), Some(&Segment::new(m, 0, 1, false)));
    }

    #[test]
    fn between_same_road_point() {
        let (g, m) = straight_road();
        let index = RoadIndex::build(&g).unwrap();
        let mut r = router(g, settings());
        let c = Cancellable::default();

        let at = point(0.0, 3.0);
        let route = r.find_route_between_points(&index, at, at, &c).unwrap();
        assert!(route.segments.is_empty());
        assert_almost_eq!(route.weight, 0.0);
        assert!(route.points(r.world()).is_empty());

        // Off-road positions snapping to the same point only pay for the connectors
        let (from, to) = (point(0.1, 3.0), point(-0.1, 3.0));
        let route = r.find_route_between_points(&index, from, to, &c).unwrap();
        assert!(route.segments.is_empty());
        let w = r.world();
        let expected = w.calc_offroad_weight(from, at) + w.calc_offroad_weight(at, to);
        assert_almost_eq!(route.weight, expected);

        // Repeated waypoints don't add detours
        let waypoints = [point(0.0, 1.0), point(0.0, 3.0), point(0.0, 3.0), point(0.0, 5.0)];
        let route = r.find_route_through(&index, &waypoints, &c).unwrap();
        assert_eq!(
            route.segments,
            (1..5).map(|i| Segment::new(m, 0, i, true)).collect::<Vec<_>>()
        );
        assert_adjacent(r.world(), &route.segments);
    }

    #[test]
    fn through_waypoints() {
        let (g, m) = straight_road();
        let index = RoadIndex::build(&g).unwrap();
        let mut r = router(g, settings());
        let c = Cancellable::default();

        let waypoints = [point(0.0, 0.0), point(0.1, 3.0), point(0.0, 6.0)];
        let route = r.find_route_through(&index, &waypoints, &c).unwrap();
        assert_eq!(
            route.segments,
            (0..6).map(|i| Segment::new(m, 0, i, true)).collect::<Vec<_>>()
        );
        assert_adjacent(r.world(), &route.segments);

        let first = r.find_route_between_points(&index, waypoints[0], waypoints[1], &c).unwrap();
        let second = r.find_route_between_points(&index, waypoints[1], waypoints[2], &c).unwrap();
        assert_almost_eq!(route.weight, first.weight + second.weight);

        assert_eq!(
            r.find_route_through(&index, &waypoints[..1], &c),
            Err(FailureReason::InternalError)
        );
    }
}
