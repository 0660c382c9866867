// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use crate::astar::InvariantViolation;
use crate::{
    AStarGraph, CrossBorderGraph, CrossBorderSegment, LatLon, NumMwmId, Weight, WeightedEdge,
    WorldGraph,
};

/// Vertex of a [RegionsSparseGraph].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeapVertex {
    /// Start point of the route, in its region.
    Start,

    /// Finish point of the route, in its region.
    Finish,

    /// Far end of the cross-border segment with the given id,
    /// in the region the segment enters.
    Border(u32),
}

/// Coarse graph over the crossings of a [CrossBorderGraph], used to pick the chain of
/// regions worth loading before a detailed search.
///
/// Moving within a region is approximated with a leap: a straight line at the leap speed
/// of the [EdgeEstimator](crate::EdgeEstimator). Every vertex is located in exactly one
/// region, and only crossings leaving that region are its outgoing edges.
pub struct RegionsSparseGraph<'a> {
    cross_border: &'a CrossBorderGraph,
    world: &'a WorldGraph,
    start: (LatLon, NumMwmId),
    finish: (LatLon, NumMwmId),
}

impl<'a> RegionsSparseGraph<'a> {
    pub fn new(
        cross_border: &'a CrossBorderGraph,
        world: &'a WorldGraph,
        start: (LatLon, NumMwmId),
        finish: (LatLon, NumMwmId),
    ) -> Self {
        Self {
            cross_border,
            world,
            start,
            finish,
        }
    }

    /// Position and region of a vertex.
    fn locate(&self, vertex: &LeapVertex) -> Option<(LatLon, NumMwmId)> {
        match vertex {
            LeapVertex::Start => Some(self.start),
            LeapVertex::Finish => Some(self.finish),
            LeapVertex::Border(id) => self
                .cross_border
                .get(*id)
                .map(|s| (s.end.point, s.end.mwm_id)),
        }
    }

    /// Weight of getting from `from` over the crossing `segment`,
    /// whose start must lie in the region of `from`.
    fn crossing_weight(&self, from: LatLon, segment: &CrossBorderSegment) -> Weight {
        self.world.calc_leap_weight(from, segment.start.point)
            + segment.weight
            + self
                .world
                .cross_border_penalty(segment.start.mwm_id, segment.end.mwm_id)
    }

    /// Regions visited by a path over this graph, including the start and finish regions.
    pub fn regions_of(&self, path: &[LeapVertex]) -> HashSet<NumMwmId> {
        let mut regions = HashSet::from([self.start.1, self.finish.1]);
        for vertex in path {
            if let LeapVertex::Border(id) = vertex {
                if let Some(segment) = self.cross_border.get(*id) {
                    regions.insert(segment.start.mwm_id);
                    regions.insert(segment.end.mwm_id);
                }
            }
        }
        regions
    }

    fn outgoing(
        &self,
        from: LatLon,
        mwm_id: NumMwmId,
        edges: &mut Vec<WeightedEdge<LeapVertex>>,
    ) {
        for (id, segment) in self.cross_border.segments_of(mwm_id) {
            if segment.start.mwm_id == mwm_id {
                edges.push(WeightedEdge::new(
                    LeapVertex::Border(id),
                    self.crossing_weight(from, segment),
                ));
            }
        }

        if mwm_id == self.finish.1 {
            edges.push(WeightedEdge::new(
                LeapVertex::Finish,
                self.world.calc_leap_weight(from, self.finish.0),
            ));
        }
    }

    /// Pushes every vertex located in `mwm_id`, with the weight of getting from it to `to`.
    fn ingoing(
        &self,
        mwm_id: NumMwmId,
        weight_to: impl Fn(LatLon) -> Weight,
        edges: &mut Vec<WeightedEdge<LeapVertex>>,
    ) {
        if self.start.1 == mwm_id {
            edges.push(WeightedEdge::new(LeapVertex::Start, weight_to(self.start.0)));
        }

        for (id, segment) in self.cross_border.segments_of(mwm_id) {
            if segment.end.mwm_id == mwm_id {
                edges.push(WeightedEdge::new(
                    LeapVertex::Border(id),
                    weight_to(segment.end.point),
                ));
            }
        }
    }
}

impl AStarGraph for RegionsSparseGraph<'_> {
    type Vertex = LeapVertex;

    fn get_edge_list(
        &mut self,
        vertex: &LeapVertex,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<LeapVertex>>,
    ) -> Result<(), InvariantViolation> {
        edges.clear();

        if is_outgoing {
            if *vertex == LeapVertex::Finish {
                return Ok(());
            }
            let Some((point, mwm_id)) = self.locate(vertex) else {
                return Err(invariant_violation!("unknown leap vertex {:?}", vertex));
            };
            self.outgoing(point, mwm_id, edges);
        } else {
            match *vertex {
                LeapVertex::Start => {}
                LeapVertex::Finish => {
                    let finish = self.finish.0;
                    self.ingoing(
                        self.finish.1,
                        |from| self.world.calc_leap_weight(from, finish),
                        edges,
                    );
                }
                LeapVertex::Border(id) => {
                    let Some(segment) = self.cross_border.get(id) else {
                        return Err(invariant_violation!("unknown cross-border segment {}", id));
                    };
                    self.ingoing(
                        segment.start.mwm_id,
                        |from| self.crossing_weight(from, segment),
                        edges,
                    );
                }
            }
        }

        Ok(())
    }

    fn heuristic_cost_estimate(&self, from: &LeapVertex, to: &LeapVertex) -> Weight {
        match (self.locate(from), self.locate(to)) {
            (Some((from, _)), Some((to, _))) => self.world.heuristic(from, to),
            _ => 0.0,
        }
    }

    fn vertex_point(&self, vertex: &LeapVertex) -> Option<LatLon> {
        self.locate(vertex).map(|(point, _)| point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astar::{find_path, find_path_bidirectional, Params};
    use crate::test_fixtures::{point, road, world};
    use crate::{Cancellable, CrossBorderSegmentEnding, RoadGeometry};

    /// Three regions in a row, `Poland` ─ `Germany_North` ─ `Germany_South`,
    /// plus a `Czechia` region touching none of them.
    fn row_of_regions() -> (RoadGeometry, [NumMwmId; 4]) {
        let mut g = RoadGeometry::default();
        let a = g.add_region("Poland");
        let b = g.add_region("Germany_North");
        let c = g.add_region("Germany_South");
        let d = g.add_region("Czechia");
        g.add_road(a, road(&[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)], true));
        g.add_road(b, road(&[(0.0, 2.0), (0.0, 3.0), (0.0, 4.0)], true));
        g.add_road(c, road(&[(0.0, 4.0), (0.0, 5.0), (0.0, 6.0)], true));
        g.add_road(d, road(&[(9.0, 0.0), (9.0, 1.0)], true));
        (g, [a, b, c, d])
    }

    #[test]
    fn region_chain() {
        let (g, [a, b, c, d]) = row_of_regions();
        let w = world(g);
        let cross_border = CrossBorderGraph::build(&w);
        assert_eq!(cross_border.len(), 4);

        let mut graph = RegionsSparseGraph::new(&cross_border, &w, (point(0.0, 0.0), a), (point(0.0, 6.0), c));
        let cancellable = Cancellable::default();
        let result = find_path(
            &mut graph,
            Params::new(LeapVertex::Start, LeapVertex::Finish, &cancellable),
        )
        .unwrap();

        assert_eq!(result.path.len(), 4);
        assert_eq!(result.path[0], LeapVertex::Start);
        assert_eq!(result.path[3], LeapVertex::Finish);

        let regions = graph.regions_of(&result.path);
        assert_eq!(regions, HashSet::from([a, b, c]));
        assert!(!regions.contains(&d));

        let bidirectional = find_path_bidirectional(
            &mut graph,
            Params::new(LeapVertex::Start, LeapVertex::Finish, &cancellable),
        )
        .unwrap();
        assert_almost_eq!(bidirectional.distance, result.distance);
    }

    #[test]
    fn penalty_only_between_groups() {
        let (g, [a, b, c, _]) = row_of_regions();
        let w = world(g);
        let cross_border = CrossBorderGraph::build(&w);
        let graph = RegionsSparseGraph::new(&cross_border, &w, (point(0.0, 0.0), a), (point(0.0, 6.0), c));

        let crossing = |from: NumMwmId, to: NumMwmId| {
            cross_border
                .segments()
                .map(|(_, s)| *s)
                .find(|s| s.start.mwm_id == from && s.end.mwm_id == to)
                .unwrap()
        };

        let a_to_b = crossing(a, b);
        let b_to_c = crossing(b, c);
        let at = a_to_b.start.point;
        assert_almost_eq!(graph.crossing_weight(at, &a_to_b), a_to_b.weight + 60.0);

        let at = b_to_c.start.point;
        assert_almost_eq!(graph.crossing_weight(at, &b_to_c), b_to_c.weight);
    }

    #[test]
    fn edges_agree_in_both_directions() {
        let (g, [a, _, c, _]) = row_of_regions();
        let w = world(g);
        let cross_border = CrossBorderGraph::build(&w);
        let mut graph = RegionsSparseGraph::new(&cross_border, &w, (point(0.0, 0.5), a), (point(0.0, 5.5), c));

        let mut vertices = vec![LeapVertex::Start, LeapVertex::Finish];
        vertices.extend(cross_border.segments().map(|(id, _)| LeapVertex::Border(id)));

        let mut edges = Vec::new();
        let mut back = Vec::new();
        for &u in &vertices {
            graph.get_edge_list(&u, true, &mut edges).unwrap();
            for edge in edges.clone() {
                graph.get_edge_list(&edge.target, false, &mut back).unwrap();
                let mirrored = back.iter().find(|e| e.target == u).unwrap();
                assert_almost_eq!(mirrored.weight, edge.weight);
            }
        }
    }

    #[test]
    fn unreachable_region() {
        let (g, [a, _, _, d]) = row_of_regions();
        let w = world(g);
        let cross_border = CrossBorderGraph::build(&w);
        let mut graph = RegionsSparseGraph::new(&cross_border, &w, (point(0.0, 0.0), a), (point(9.0, 0.0), d));

        let cancellable = Cancellable::default();
        let result = find_path(
            &mut graph,
            Params::new(LeapVertex::Start, LeapVertex::Finish, &cancellable),
        );
        assert_eq!(result, Err(crate::AStarError::NoPath));
    }

    #[test]
    fn same_region() {
        let (g, [a, _, _, _]) = row_of_regions();
        let w = world(g);
        let mut cross_border = CrossBorderGraph::default();
        cross_border.add_segment(
            7,
            CrossBorderSegment {
                start: CrossBorderSegmentEnding::new(point(0.0, 2.0), a),
                end: CrossBorderSegmentEnding::new(point(0.0, 3.0), 1),
                weight: 10.0,
            },
        );
        let mut graph = RegionsSparseGraph::new(&cross_border, &w, (point(0.0, 0.0), a), (point(0.0, 1.0), a));

        let cancellable = Cancellable::default();
        let result = find_path(
            &mut graph,
            Params::new(LeapVertex::Start, LeapVertex::Finish, &cancellable),
        )
        .unwrap();
        assert_eq!(result.path, vec![LeapVertex::Start, LeapVertex::Finish]);
        assert_eq!(graph.regions_of(&result.path), HashSet::from([a]));
    }
}
