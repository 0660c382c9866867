// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::astar::InvariantViolation;
use crate::{
    AStarGraph, FakeJointSegment, JointSegment, LatLon, Segment, Weight, WeightedEdge, WorldGraph,
};

pub type JointEdge = WeightedEdge<JointSegment>;

#[derive(Debug, Clone, Copy)]
struct Endings {
    start_segment: Segment,
    end_segment: Segment,
    start_point: LatLon,
    end_point: LatLon,
}

/// Joint graph of a single route, searched by [find_path](crate::astar::find_path)
/// or [find_path_bidirectional](crate::astar::find_path_bidirectional).
///
/// After [JointGraphStarter::init], the route's start and end segments are represented
/// by the invisible [JointSegment::START] and [JointSegment::END], connected by fake
/// joint segments to the nearest joints. All other vertices are real joint segments,
/// generated on demand from the [WorldGraph].
///
/// Weight of an edge `u → v` is the cost of getting from the end of the last raw segment
/// of `u` to the end of the last raw segment of `v`, in both search directions. For the
/// backward direction this requires remembering, for every generated vertex, its weight
/// without its first raw segment (the saved weight). Saved weights don't depend on the
/// path a vertex was reached by, so they are never evicted; [JointGraphStarter::reset]
/// clears them together with all other per-route state.
pub struct JointGraphStarter<'w> {
    graph: &'w mut WorldGraph,
    endings: Option<Endings>,
    wave_window: usize,
    fake_id: u32,
    fake_joint_segments: HashMap<JointSegment, FakeJointSegment>,
    reconstructed_fake_joints: HashMap<JointSegment, Vec<Segment>>,
    saved_weight: HashMap<JointSegment, Weight>,
    start_out_edges: Vec<JointEdge>,
    end_out_edges: Vec<JointEdge>,
    parent_weights: Vec<Weight>,
    segment_edges: Vec<WeightedEdge<Segment>>,
}

impl<'w> JointGraphStarter<'w> {
    pub fn new(graph: &'w mut WorldGraph) -> Self {
        Self {
            graph,
            endings: None,
            wave_window: 3,
            fake_id: 0,
            fake_joint_segments: HashMap::default(),
            reconstructed_fake_joints: HashMap::default(),
            saved_weight: HashMap::default(),
            start_out_edges: Vec::default(),
            end_out_edges: Vec::default(),
            parent_weights: Vec::default(),
            segment_edges: Vec::default(),
        }
    }

    /// Sets how many parents of each wave [AStarGraph::are_waves_connectible] replays.
    pub fn with_wave_window(mut self, wave_window: usize) -> Self {
        self.wave_window = wave_window;
        self
    }

    pub fn graph(&self) -> &WorldGraph {
        &*self.graph
    }

    pub fn is_ready(&self) -> bool {
        self.endings.is_some()
    }

    pub fn start_segment(&self) -> Option<Segment> {
        self.endings.map(|e| e.start_segment)
    }

    pub fn end_segment(&self) -> Option<Segment> {
        self.endings.map(|e| e.end_segment)
    }

    /// Prepares the joint graph for a route between two raw segments,
    /// discarding the state of any previous route.
    pub fn init(&mut self, start: Segment, end: Segment) -> Result<(), InvariantViolation> {
        self.reset();

        let (Some(start_point), Some(end_point)) =
            (self.graph.point(&start, true), self.graph.point(&end, true))
        else {
            return Err(invariant_violation!(
                "route endings {} and {} must be known segments",
                start,
                end
            ));
        };

        self.endings = Some(Endings {
            start_segment: start,
            end_segment: end,
            start_point,
            end_point,
        });
        self.reconstructed_fake_joints
            .insert(JointSegment::START, vec![start]);
        self.reconstructed_fake_joints
            .insert(JointSegment::END, vec![end]);

        self.start_out_edges = self.find_first_joints(start, true)?;
        self.end_out_edges = self.find_first_joints(end, false)?;

        self.saved_weight.insert(JointSegment::END, 0.0);
        for edge in &self.end_out_edges {
            self.saved_weight.insert(edge.target, edge.weight);
        }

        log::debug!(
            "joint graph from {} to {}: {} start edges, {} end edges",
            start,
            end,
            self.start_out_edges.len(),
            self.end_out_edges.len()
        );
        Ok(())
    }

    /// Forgets everything about the current route.
    pub fn reset(&mut self) {
        self.endings = None;
        self.fake_id = 0;
        self.fake_joint_segments.clear();
        self.reconstructed_fake_joints.clear();
        self.saved_weight.clear();
        self.start_out_edges.clear();
        self.end_out_edges.clear();
    }

    fn endings(&self) -> Result<Endings, InvariantViolation> {
        self.endings
            .ok_or_else(|| invariant_violation!("joint graph starter used before init"))
    }

    /// Explores raw segments from the start (forward) or the end (backward) up to the first
    /// joints and to the opposite ending, wrapping every chain found into a fake joint segment.
    ///
    /// Edge weights are the cost of the chain without its first raw segment.
    fn find_first_joints(
        &mut self,
        origin: Segment,
        from_start: bool,
    ) -> Result<Vec<JointEdge>, InvariantViolation> {
        let endings = self.endings()?;
        let opposite = if from_start {
            endings.end_segment
        } else {
            endings.start_segment
        };

        let mut queue: VecDeque<Segment> = VecDeque::from([origin]);
        let mut parents: HashMap<Segment, Segment> = HashMap::default();
        let mut weights: HashMap<Segment, Weight> = HashMap::from([(origin, 0.0)]);
        let mut reached: BTreeSet<Segment> = BTreeSet::default();
        let mut edges = std::mem::take(&mut self.segment_edges);

        while let Some(segment) = queue.pop_front() {
            if segment == opposite || self.graph.is_joint(&segment, from_start) {
                reached.insert(segment);
                continue;
            }

            let Some(&base) = weights.get(&segment) else {
                continue;
            };

            self.graph.get_edge_list(&segment, from_start, &mut edges);
            for edge in &edges {
                let candidate = base + edge.weight;
                if weights.get(&edge.target).map_or(true, |&known| known > candidate) {
                    parents.insert(edge.target, segment);
                    weights.insert(edge.target, candidate);
                    queue.push_back(edge.target);
                }
            }
        }
        self.segment_edges = edges;

        let mut result = Vec::with_capacity(reached.len());
        for segment in reached {
            let mut path = vec![segment];
            let mut current = segment;
            while current != origin {
                let Some(&parent) = parents.get(&current) else {
                    return Err(invariant_violation!(
                        "broken chain from {} to {} at {}",
                        origin,
                        segment,
                        current
                    ));
                };
                path.push(parent);
                current = parent;
            }

            let weight = weights.get(&segment).copied().unwrap_or_default();
            let joint = if from_start {
                path.reverse();
                self.create_fake_joint(origin, segment, path)
            } else {
                self.create_fake_joint(segment, origin, path)
            };
            result.push(WeightedEdge::new(joint, weight));
        }

        Ok(result)
    }

    fn create_fake_joint(&mut self, from: Segment, to: Segment, path: Vec<Segment>) -> JointSegment {
        let joint = JointSegment::Fake(self.fake_id);
        self.fake_id += 1;
        self.fake_joint_segments
            .insert(joint, FakeJointSegment::new(from, to));
        self.reconstructed_fake_joints.insert(joint, path);
        joint
    }

    fn fake_joint_segment(&self, joint: &JointSegment) -> Result<&FakeJointSegment, InvariantViolation> {
        self.fake_joint_segments
            .get(joint)
            .ok_or_else(|| invariant_violation!("unknown fake joint {}", joint))
    }

    fn saved_weight(&self, joint: &JointSegment) -> Result<Weight, InvariantViolation> {
        self.saved_weight
            .get(joint)
            .copied()
            .ok_or_else(|| invariant_violation!("no saved weight of {}", joint))
    }

    /// Returns the raw segment from which `vertex` is expanded: its last one going forward,
    /// its first one going backward. Fake joints which already touch the opposite ending
    /// are instead connected with the opposite invisible joint, and [None] is returned.
    fn get_parent_segment(
        &self,
        vertex: &JointSegment,
        is_outgoing: bool,
        edges: &mut Vec<JointEdge>,
    ) -> Result<Option<Segment>, InvariantViolation> {
        match vertex {
            JointSegment::Real { .. } => Ok(vertex.segment(!is_outgoing)),
            JointSegment::Fake(_) => {
                let fake = self.fake_joint_segment(vertex)?;
                let endings = self.endings()?;
                let parent = fake.segment(!is_outgoing);

                if is_outgoing && parent == endings.end_segment {
                    edges.push(WeightedEdge::new(JointSegment::END, 0.0));
                    return Ok(None);
                }
                if !is_outgoing && parent == endings.start_segment {
                    edges.push(WeightedEdge::new(JointSegment::START, self.saved_weight(vertex)?));
                    return Ok(None);
                }

                Ok(Some(parent))
            }
            JointSegment::Invisible(_) => Ok(None),
        }
    }

    /// Finds the fake joint of the opposite ending which begins (`is_outgoing`)
    /// or finishes with `segment`.
    fn matching_fake_joint(&self, segment: &Segment, is_outgoing: bool) -> Option<JointEdge> {
        let candidates = if is_outgoing {
            &self.end_out_edges
        } else {
            &self.start_out_edges
        };

        candidates.iter().copied().find(|edge| {
            self.fake_joint_segments
                .get(&edge.target)
                .is_some_and(|fake| fake.segment(is_outgoing) == *segment)
        })
    }

    /// Raw segments of a joint segment in travel order. Invisible joints have none.
    pub fn reconstruct_joint(&self, joint: &JointSegment) -> Result<Vec<Segment>, InvariantViolation> {
        match joint {
            JointSegment::Invisible(_) => Ok(Vec::new()),
            JointSegment::Fake(_) => self
                .reconstructed_fake_joints
                .get(joint)
                .cloned()
                .ok_or_else(|| invariant_violation!("no raw path of {}", joint)),
            JointSegment::Real { .. } => Ok(joint.segments()),
        }
    }

    /// Concatenates raw segments of all joints of a path found by A*.
    pub fn reconstruct_route(&self, joints: &[JointSegment]) -> Result<Vec<Segment>, InvariantViolation> {
        let mut route = Vec::new();
        for joint in joints {
            route.extend(self.reconstruct_joint(joint)?);
        }
        Ok(route)
    }

    fn first_segment(&self, joint: &JointSegment) -> Option<Segment> {
        match joint {
            JointSegment::Real { .. } => joint.segment(true),
            _ => self
                .reconstructed_fake_joints
                .get(joint)
                .and_then(|path| path.first().copied()),
        }
    }

    fn last_segment(&self, joint: &JointSegment) -> Option<Segment> {
        match joint {
            JointSegment::Real { .. } => joint.segment(false),
            _ => self
                .reconstructed_fake_joints
                .get(joint)
                .and_then(|path| path.last().copied()),
        }
    }

    /// Checks that the raw transition between two consecutive joints is an edge of the world graph.
    fn is_transition_allowed(&mut self, from: &JointSegment, to: &JointSegment) -> bool {
        if from.is_invisible() || to.is_invisible() {
            return true;
        }

        let (Some(last), Some(first)) = (self.last_segment(from), self.first_segment(to)) else {
            log::error!("can't check transition {} -> {}", from, to);
            return false;
        };

        let mut edges = std::mem::take(&mut self.segment_edges);
        self.graph.get_edge_list(&last, true, &mut edges);
        let allowed = edges.iter().any(|edge| edge.target == first);
        self.segment_edges = edges;
        allowed
    }
}

impl AStarGraph for JointGraphStarter<'_> {
    type Vertex = JointSegment;

    fn get_edge_list(
        &mut self,
        vertex: &JointSegment,
        is_outgoing: bool,
        edges: &mut Vec<JointEdge>,
    ) -> Result<(), InvariantViolation> {
        edges.clear();
        invariant!(self.endings.is_some(), "joint graph starter used before init");

        // START only leads out to the start fake joints and END is only entered from the
        // end fake joints. Entering END costs nothing, as the weight of a fake joint
        // already covers the end segment.
        if *vertex == JointSegment::START {
            if is_outgoing {
                edges.extend_from_slice(&self.start_out_edges);
            }
            return Ok(());
        }
        if *vertex == JointSegment::END {
            if !is_outgoing {
                edges.extend(self.end_out_edges.iter().map(|e| WeightedEdge::new(e.target, 0.0)));
            }
            return Ok(());
        }

        let Some(parent) = self.get_parent_segment(vertex, is_outgoing, edges)? else {
            return Ok(());
        };

        let mut parent_weights = std::mem::take(&mut self.parent_weights);
        parent_weights.clear();
        self.graph
            .get_joint_edges(&parent, is_outgoing, edges, &mut parent_weights);

        // Real joint segments passing through a fake joint's far segment
        // may also continue along that fake joint.
        let real_count = edges.len();
        for i in 0..real_count {
            let Some(segment) = edges[i].target.segment(is_outgoing) else {
                continue;
            };
            if let Some(fake) = self.matching_fake_joint(&segment, is_outgoing) {
                edges.push(fake);
                parent_weights.push(parent_weights[i]);
            }
        }

        invariant!(
            edges.len() == parent_weights.len(),
            "{} edges of {} with {} parent weights",
            edges.len(),
            vertex,
            parent_weights.len()
        );

        if is_outgoing {
            for (edge, parent_weight) in edges.iter_mut().zip(&parent_weights) {
                edge.weight += parent_weight;
            }
        } else {
            let saved = self.saved_weight(vertex)?;
            for (edge, parent_weight) in edges.iter_mut().zip(&parent_weights) {
                self.saved_weight.insert(edge.target, edge.weight);
                edge.weight = saved + parent_weight;
            }
        }

        self.parent_weights = parent_weights;
        Ok(())
    }

    fn heuristic_cost_estimate(&self, from: &JointSegment, to: &JointSegment) -> Weight {
        let Some(endings) = self.endings else {
            return 0.0;
        };

        let target = if *to == JointSegment::END {
            endings.end_point
        } else {
            endings.start_point
        };

        match self.last_segment(from) {
            Some(segment) => self.graph.heuristic_to(&segment, target),
            None => {
                log::error!("no segment to estimate {} -> {} from", from, to);
                0.0
            }
        }
    }

    /// Replays a window of parents of both waves around `common` and checks
    /// that all raw transitions between consecutive joints are still allowed.
    fn are_waves_connectible(
        &mut self,
        forward_parents: &HashMap<JointSegment, JointSegment>,
        common: &JointSegment,
        backward_parents: &HashMap<JointSegment, JointSegment>,
    ) -> bool {
        let mut chain = vec![*common];
        let mut current = *common;
        for _ in 0..self.wave_window {
            let Some(&parent) = forward_parents.get(&current) else {
                break;
            };
            chain.push(parent);
            current = parent;
        }
        chain.reverse();

        current = *common;
        for _ in 0..self.wave_window {
            let Some(&parent) = backward_parents.get(&current) else {
                break;
            };
            chain.push(parent);
            current = parent;
        }

        chain
            .windows(2)
            .all(|pair| self.is_transition_allowed(&pair[0], &pair[1]))
    }

    fn vertex_point(&self, vertex: &JointSegment) -> Option<LatLon> {
        self.graph.point(&self.last_segment(vertex)?, true)
    }
}
