// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use crate::astar::InvariantViolation;
use crate::{
    AStarGraph, CrossBorderGraph, CrossMwmTransitions, EdgeEstimator, IndexGraph, JointSegment,
    LatLon, NumMwmId, RoadGeometryProvider, RoadInfo, RoutingSettings, Segment, Weight,
    WeightedEdge,
};

/// Policy of a [WorldGraph] for generating edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorldGraphMode {
    /// Raw segments of the region of a segment, twins are never followed.
    SingleMwm,

    /// Raw segments with twins, searched directly.
    NoLeaps,

    /// Joint segments with twins.
    #[default]
    Joints,

    /// Joint segments within one region.
    JointSingleMwm,
}

impl WorldGraphMode {
    /// Searches in this mode go over [JointSegments](JointSegment) instead of raw segments.
    pub fn uses_joints(self) -> bool {
        matches!(self, Self::Joints | Self::JointSingleMwm)
    }

    pub fn crosses_borders(self) -> bool {
        matches!(self, Self::NoLeaps | Self::Joints)
    }
}

/// Single graph over all loaded regions.
///
/// [IndexGraphs](IndexGraph) are built on first touch of their region and kept
/// for the whole lifetime of the world graph.
pub struct WorldGraph {
    geometry: Arc<dyn RoadGeometryProvider>,
    transitions: Arc<CrossMwmTransitions>,
    cross_border: Option<Arc<CrossBorderGraph>>,
    estimator: EdgeEstimator,
    mode: WorldGraphMode,
    cross_border_penalty: Weight,
    graphs: HashMap<NumMwmId, Arc<IndexGraph>>,
    allowed_regions: Option<HashSet<NumMwmId>>,
    hops: Vec<WeightedEdge<Segment>>,
}

impl WorldGraph {
    pub fn new(
        geometry: Arc<dyn RoadGeometryProvider>,
        transitions: Arc<CrossMwmTransitions>,
        estimator: EdgeEstimator,
        settings: &RoutingSettings,
    ) -> Self {
        Self {
            geometry,
            transitions,
            cross_border: None,
            estimator,
            mode: settings.mode,
            cross_border_penalty: settings.cross_border_penalty,
            graphs: HashMap::default(),
            allowed_regions: None,
            hops: Vec::default(),
        }
    }

    /// Attaches a coarse graph of border crossings, used by the leap pre-pass of a
    /// [Router](crate::Router).
    pub fn with_cross_border_graph(mut self, graph: Arc<CrossBorderGraph>) -> Self {
        self.cross_border = Some(graph);
        self
    }

    pub fn cross_border_graph(&self) -> Option<&CrossBorderGraph> {
        self.cross_border.as_deref()
    }

    pub fn geometry(&self) -> &dyn RoadGeometryProvider {
        self.geometry.as_ref()
    }

    pub fn transitions(&self) -> &CrossMwmTransitions {
        &self.transitions
    }

    pub fn estimator(&self) -> &EdgeEstimator {
        &self.estimator
    }

    pub fn mode(&self) -> WorldGraphMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: WorldGraphMode) {
        self.mode = mode;
    }

    /// Limits edges to the given regions; [None] lifts the limit.
    pub fn set_allowed_regions(&mut self, regions: Option<HashSet<NumMwmId>>) {
        self.allowed_regions = regions;
    }

    #[inline]
    pub fn is_allowed(&self, mwm_id: NumMwmId) -> bool {
        self.allowed_regions
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&mwm_id))
    }

    /// Returns the graph of a region, building it on first use,
    /// or [None] if the region is unknown.
    pub fn index_graph(&mut self, mwm_id: NumMwmId) -> Option<Arc<IndexGraph>> {
        if let Some(graph) = self.graphs.get(&mwm_id) {
            return Some(graph.clone());
        }

        let name = self.geometry.region_name(mwm_id)?;
        log::info!("loading region {} ({})", mwm_id, name);
        let graph = Arc::new(IndexGraph::build(mwm_id, self.geometry.as_ref()));
        self.graphs.insert(mwm_id, graph.clone());
        Some(graph)
    }

    /// Builds graphs of all given regions which aren't loaded yet, in parallel.
    pub fn prewarm(&mut self, regions: &[NumMwmId]) {
        let geometry = self.geometry.as_ref();
        let mut missing: Vec<NumMwmId> = regions
            .iter()
            .copied()
            .filter(|id| !self.graphs.contains_key(id) && geometry.region_name(*id).is_some())
            .collect();
        missing.sort_unstable();
        missing.dedup();

        if missing.is_empty() {
            return;
        }

        log::info!("prewarming {} regions", missing.len());
        let built: Vec<(NumMwmId, IndexGraph)> = missing
            .par_iter()
            .map(|&id| (id, IndexGraph::build(id, geometry)))
            .collect();

        for (id, graph) in built {
            self.graphs.insert(id, Arc::new(graph));
        }
    }

    /// Regions with an already built [IndexGraph], in ascending order.
    pub fn loaded_regions(&self) -> Vec<NumMwmId> {
        let mut loaded: Vec<NumMwmId> = self.graphs.keys().copied().collect();
        loaded.sort_unstable();
        loaded
    }

    pub fn road(&self, segment: &Segment) -> Option<&RoadInfo> {
        self.geometry.road(segment.mwm_id, segment.feature_id)
    }

    /// Position of the front (`front == true`) or back point of a segment.
    pub fn point(&self, segment: &Segment, front: bool) -> Option<LatLon> {
        self.road(segment)?.point(segment.point_id(front))
    }

    pub fn is_valid_segment(&self, segment: &Segment) -> bool {
        self.road(segment).is_some_and(|road| road.allows(segment))
    }

    /// Weight of a raw segment, [Weight::INFINITY] for unknown segments.
    pub fn calc_segment_weight(&self, segment: &Segment) -> Weight {
        self.road(segment)
            .map_or(Weight::INFINITY, |road| self.estimator.segment_weight(road, segment))
    }

    pub fn calc_leap_weight(&self, from: LatLon, to: LatLon) -> Weight {
        self.estimator.leap_weight(from, to)
    }

    pub fn calc_offroad_weight(&self, from: LatLon, to: LatLon) -> Weight {
        self.estimator.offroad_weight(from, to)
    }

    pub fn heuristic(&self, from: LatLon, to: LatLon) -> Weight {
        self.estimator.heuristic(from, to)
    }

    /// Heuristic from the front point of a segment to a position; 0 for unknown segments.
    pub fn heuristic_to(&self, from: &Segment, to: LatLon) -> Weight {
        self.point(from, true)
            .map_or(0.0, |from| self.estimator.heuristic(from, to))
    }

    /// Penalty of moving between two regions: zero within a region group
    /// (regions whose names share the part before the first `_`), the configured
    /// penalty otherwise.
    pub fn cross_border_penalty(&self, from: NumMwmId, to: NumMwmId) -> Weight {
        if from == to {
            return 0.0;
        }

        let group = |id| {
            self.geometry
                .region_name(id)
                .map(|name| name.split('_').next().unwrap_or(name))
        };
        match (group(from), group(to)) {
            (Some(a), Some(b)) if a == b => 0.0,
            _ => self.cross_border_penalty,
        }
    }

    /// Replaces `edges` with the raw edges leaving (`is_outgoing`) or entering `segment`.
    ///
    /// Edges within the segment's region come from its [IndexGraph]; in modes crossing
    /// borders, twins from the transition table follow, with the cross-border penalty added.
    /// Nothing is produced for segments of regions which aren't allowed.
    pub fn get_edge_list(
        &mut self,
        segment: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<Segment>>,
    ) {
        edges.clear();
        if !self.is_allowed(segment.mwm_id) {
            return;
        }

        if let Some(graph) = self.index_graph(segment.mwm_id) {
            graph.get_edge_list(
                self.geometry.as_ref(),
                &self.estimator,
                segment,
                is_outgoing,
                edges,
            );
        }

        if self.mode.crosses_borders() {
            self.add_twin_edges(segment, is_outgoing, edges);
        }
    }

    fn add_twin_edges(
        &self,
        segment: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<Segment>>,
    ) {
        for twin in self.transitions.twins(segment, is_outgoing) {
            if !self.is_allowed(twin.mwm_id) {
                continue;
            }

            let entered = if is_outgoing { twin } else { segment };
            let weight = self.calc_segment_weight(entered)
                + self.cross_border_penalty(segment.mwm_id, twin.mwm_id);
            edges.push(WeightedEdge::new(*twin, weight));
        }
    }

    /// Checks if the front (`front == true`) or back point of a segment bounds joint
    /// segments: it's a joint of the segment's [IndexGraph] or a region border point.
    pub fn is_joint(&mut self, segment: &Segment, front: bool) -> bool {
        let rp = segment.road_point(front);
        if self.transitions.is_border_point(segment.mwm_id, &rp) {
            return true;
        }

        self.index_graph(segment.mwm_id)
            .map_or(true, |graph| graph.is_joint(&rp))
    }

    /// Expands the joint segment whose last (`is_outgoing`) or first segment is `parent`.
    ///
    /// Every raw edge of `parent` (a hop) is followed along its feature up to the next
    /// joint, producing a real [JointSegment]. Weights are split in two parts: the weight
    /// of the hop itself goes into `parent_weights`, while `edges` carry the rest. Going
    /// forward, the rest is the weight of the joint segment after its first raw segment.
    /// Going backward, it is the weight of the joint segment without its first raw segment,
    /// which is what the next backward expansion of that joint segment needs.
    pub fn get_joint_edges(
        &mut self,
        parent: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<JointSegment>>,
        parent_weights: &mut Vec<Weight>,
    ) {
        let mut hops = std::mem::take(&mut self.hops);
        self.get_edge_list(parent, is_outgoing, &mut hops);

        for hop in &hops {
            let Some((last, rest)) = self.walk_to_joint(hop.target, is_outgoing) else {
                continue;
            };

            let joint = if is_outgoing {
                JointSegment::real(&hop.target, &last)
            } else {
                JointSegment::real(&last, &hop.target)
            };
            edges.push(WeightedEdge::new(joint, rest));
            parent_weights.push(hop.weight);
        }

        self.hops = hops;
    }

    /// Follows the feature of `first` forward (or backward) until a segment whose front
    /// (or back) point is a joint. Returns that segment with the accumulated weight.
    fn walk_to_joint(&mut self, first: Segment, is_outgoing: bool) -> Option<(Segment, Weight)> {
        let segment_count = self.road(&first)?.segment_count();
        let mut current = first;
        let mut rest: Weight = 0.0;

        while !self.is_joint(&current, is_outgoing) {
            let Some(next) = current.step(is_outgoing, segment_count) else {
                log::error!("{} ends its road without a joint", current);
                return None;
            };

            rest += if is_outgoing {
                self.calc_segment_weight(&next)
            } else {
                self.calc_segment_weight(&current)
            };
            current = next;
        }

        Some((current, rest))
    }
}

impl AStarGraph for WorldGraph {
    type Vertex = Segment;

    fn get_edge_list(
        &mut self,
        vertex: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<Segment>>,
    ) -> Result<(), InvariantViolation> {
        self.get_edge_list(vertex, is_outgoing, edges);
        Ok(())
    }

    fn heuristic_cost_estimate(&self, from: &Segment, to: &Segment) -> Weight {
        match self.point(to, true) {
            Some(to) => self.heuristic_to(from, to),
            None => 0.0,
        }
    }

    fn vertex_point(&self, vertex: &Segment) -> Option<LatLon> {
        self.point(vertex, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{all_segments, chain, road, two_regions, world, world_with};
    use crate::{RoadGeometry, RoutingSettings};

    #[test]
    fn penalty_by_region_group() {
        let mut g = RoadGeometry::default();
        let a = g.add_region("Poland_Masovia");
        let b = g.add_region("Poland_Lodz");
        let c = g.add_region("Germany");
        let w = world(g);
        assert_eq!(w.cross_border_penalty(a, a), 0.0);
        assert_eq!(w.cross_border_penalty(a, b), 0.0);
        assert_eq!(w.cross_border_penalty(a, c), 60.0);
        assert_eq!(w.cross_border_penalty(c, b), 60.0);
    }

    #[test]
    fn twins_with_penalty() {
        let (g, west, east) = two_regions("Poland", "Germany");
        let mut w = world(g);

        let exit = Segment::new(west, 0, 1, true);
        let enter = Segment::new(east, 0, 0, true);

        let mut edges = Vec::new();
        w.get_edge_list(&exit, true, &mut edges);
        let twin = edges.iter().find(|e| e.target == enter).unwrap();
        assert_almost_eq!(twin.weight, w.calc_segment_weight(&enter) + 60.0);

        w.get_edge_list(&enter, false, &mut edges);
        let twin = edges.iter().find(|e| e.target == exit).unwrap();
        assert_almost_eq!(twin.weight, w.calc_segment_weight(&enter) + 60.0);

        assert!(w.is_joint(&exit, true));
        assert!(w.is_joint(&enter, false));
    }

    #[test]
    fn single_region_modes_skip_twins() {
        let (g, west, east) = two_regions("Poland", "Germany");
        let settings = RoutingSettings {
            mode: WorldGraphMode::JointSingleMwm,
            ..RoutingSettings::default()
        };
        let mut w = world_with(g, settings);

        let mut edges = Vec::new();
        w.get_edge_list(&Segment::new(west, 0, 1, true), true, &mut edges);
        assert!(edges.iter().all(|e| e.target.mwm_id == west));

        w.set_mode(WorldGraphMode::NoLeaps);
        w.get_edge_list(&Segment::new(west, 0, 1, true), true, &mut edges);
        assert!(edges.iter().any(|e| e.target.mwm_id == east));
    }

    #[test]
    fn allowed_regions() {
        let (g, west, east) = two_regions("Poland", "Germany");
        let mut w = world(g);
        w.set_allowed_regions(Some(HashSet::from([west])));

        let mut edges = Vec::new();
        w.get_edge_list(&Segment::new(west, 0, 1, true), true, &mut edges);
        assert!(edges.iter().all(|e| e.target.mwm_id == west));

        w.get_edge_list(&Segment::new(east, 0, 0, true), true, &mut edges);
        assert!(edges.is_empty());
    }

    #[test]
    fn lazy_load_and_prewarm() {
        let (g, west, east) = two_regions("Poland", "Germany");
        let mut w = world(g);
        assert!(w.loaded_regions().is_empty());

        assert!(w.index_graph(west).is_some());
        assert!(w.index_graph(42).is_none());
        assert_eq!(w.loaded_regions(), vec![west]);

        w.prewarm(&[east, west, east, 42]);
        assert_eq!(w.loaded_regions(), vec![west, east]);
    }

    #[test]
    fn outgoing_and_ingoing_agree_across_border() {
        let (mut g, west, east) = two_regions("Poland", "Germany");
        g.add_road(west, road(&[(1.0, 0.0), (0.0, 0.0)], false));
        g.add_road(east, road(&[(0.0, 0.0), (-1.0, 0.0)], true));
        let mut w = world(g);

        for s in all_segments(w.geometry()) {
            let mut out = Vec::new();
            w.get_edge_list(&s, true, &mut out);
            for edge in &out {
                let mut into = Vec::new();
                w.get_edge_list(&edge.target, false, &mut into);
                let back = into.iter().find(|i| i.target == s);
                assert!(back.is_some(), "{} -> {} missing ingoing", s, edge.target);
                assert_almost_eq!(back.unwrap().weight, edge.weight);
            }
        }
    }

    #[test]
    fn joint_edges_collapse_chains() {
        let (g, m) = chain(5);
        let mut w = world(g);

        // Road 0 ends where the chain (road 1, 5 segments) starts
        let a = Segment::new(m, 0, 0, true);
        let mut edges = Vec::new();
        let mut parent_weights = Vec::new();
        w.get_joint_edges(&a, true, &mut edges, &mut parent_weights);

        let first = Segment::new(m, 1, 0, true);
        let last = Segment::new(m, 1, 4, true);
        let i = edges
            .iter()
            .position(|e| e.target == JointSegment::real(&first, &last))
            .unwrap();

        let total: Weight = (0..5)
            .map(|idx| w.calc_segment_weight(&Segment::new(m, 1, idx, true)))
            .sum();
        assert_almost_eq!(parent_weights[i], w.calc_segment_weight(&first));
        assert_almost_eq!(edges[i].weight + parent_weights[i], total);

        // Backward from road 2 reaches the same joint, without its first segment
        let b = Segment::new(m, 2, 0, true);
        edges.clear();
        parent_weights.clear();
        w.get_joint_edges(&b, false, &mut edges, &mut parent_weights);
        let i = edges
            .iter()
            .position(|e| e.target == JointSegment::real(&first, &last))
            .unwrap();
        assert_almost_eq!(edges[i].weight, total - w.calc_segment_weight(&first));
        assert_almost_eq!(parent_weights[i], w.calc_segment_weight(&b));
    }
}
