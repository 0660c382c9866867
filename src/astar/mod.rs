// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Graph-agnostic A* searches.
//!
//! Both [find_path] and [find_path_bidirectional] run over anything implementing
//! [AStarGraph]: raw [Segments](crate::Segment) of a [WorldGraph](crate::WorldGraph),
//! [JointSegments](crate::JointSegment) of a [JointGraphStarter](crate::JointGraphStarter),
//! or the coarse [RegionsSparseGraph](crate::RegionsSparseGraph).

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::{AStarProgress, LatLon, Weight};

mod bidirectional;
mod cancel;
mod error;
mod flat;

pub use bidirectional::find_path_bidirectional;
pub use cancel::Cancellable;
pub use error::{AStarError, InvariantViolation, DEFAULT_STEP_LIMIT};
pub use flat::find_path;

/// Slack used when comparing weights, to absorb floating-point noise.
pub const DEFAULT_WEIGHT_EPSILON: Weight = 1e-6;

/// How many vertices are dequeued between two checks of a [Cancellable].
pub const CANCELLATION_POLL_PERIOD: usize = 128;

/// A directed, weighted connection to a `target` vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedEdge<V> {
    pub target: V,
    pub weight: Weight,
}

impl<V> WeightedEdge<V> {
    #[inline]
    pub const fn new(target: V, weight: Weight) -> Self {
        Self { target, weight }
    }
}

/// Graph which can be searched with [find_path] or [find_path_bidirectional].
pub trait AStarGraph {
    type Vertex: Copy + Eq + Hash + Debug;

    /// Appends edges leaving (`is_outgoing`) or entering `vertex` into `edges`.
    ///
    /// For ingoing edges, [WeightedEdge::target] is the source of the edge and
    /// [WeightedEdge::weight] is the weight of the edge from the target to `vertex`.
    fn get_edge_list(
        &mut self,
        vertex: &Self::Vertex,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<Self::Vertex>>,
    ) -> Result<(), InvariantViolation>;

    /// Admissible and consistent lower bound of the cost between two vertices.
    fn heuristic_cost_estimate(&self, from: &Self::Vertex, to: &Self::Vertex) -> Weight;

    /// Checks that the two halves of a bidirectional search may be joined at `common`.
    ///
    /// Parent maps point towards the respective search origin.
    fn are_waves_connectible(
        &mut self,
        _forward_parents: &HashMap<Self::Vertex, Self::Vertex>,
        _common: &Self::Vertex,
        _backward_parents: &HashMap<Self::Vertex, Self::Vertex>,
    ) -> bool {
        true
    }

    /// Geographic position of a vertex, used only for progress reporting.
    fn vertex_point(&self, _vertex: &Self::Vertex) -> Option<LatLon> {
        None
    }
}

/// Inputs of a single search.
pub struct Params<'a, V> {
    pub start: V,
    pub finish: V,
    pub cancellable: &'a Cancellable,
    pub step_limit: usize,
    pub weight_epsilon: Weight,
    pub progress: Option<&'a mut AStarProgress>,
}

impl<'a, V> Params<'a, V> {
    pub fn new(start: V, finish: V, cancellable: &'a Cancellable) -> Self {
        Self {
            start,
            finish,
            cancellable,
            step_limit: DEFAULT_STEP_LIMIT,
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
            progress: None,
        }
    }
}

/// Successful search outcome: vertices from start to finish and the path weight.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingResult<V> {
    pub path: Vec<V>,
    pub distance: Weight,
}

/// Follows `parents` from `last` back to the search origin; returns the path
/// in origin-to-`last` order.
pub(crate) fn reconstruct_path<V: Copy + Eq + Hash>(parents: &HashMap<V, V>, mut last: V) -> Vec<V> {
    let mut path = vec![last];

    while let Some(&v) = parents.get(&last) {
        path.push(v);
        last = v;
    }

    path.reverse();
    return path;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small explicit graph with integer vertices and a zero heuristic.
    #[derive(Debug, Default)]
    pub(crate) struct TestGraph {
        pub outgoing: HashMap<u32, Vec<(u32, Weight)>>,
        pub ingoing: HashMap<u32, Vec<(u32, Weight)>>,
    }

    impl TestGraph {
        pub fn from_edges(edges: &[(u32, u32, Weight)]) -> Self {
            let mut g = Self::default();
            for &(from, to, weight) in edges {
                g.outgoing.entry(from).or_default().push((to, weight));
                g.ingoing.entry(to).or_default().push((from, weight));
            }
            g
        }
    }

    impl AStarGraph for TestGraph {
        type Vertex = u32;

        fn get_edge_list(
            &mut self,
            vertex: &u32,
            is_outgoing: bool,
            edges: &mut Vec<WeightedEdge<u32>>,
        ) -> Result<(), InvariantViolation> {
            edges.clear();
            let adjacency = if is_outgoing {
                &self.outgoing
            } else {
                &self.ingoing
            };
            if let Some(neighbors) = adjacency.get(vertex) {
                edges.extend(neighbors.iter().map(|&(v, w)| WeightedEdge::new(v, w)));
            }
            Ok(())
        }

        fn heuristic_cost_estimate(&self, _from: &u32, _to: &u32) -> Weight {
            0.0
        }
    }

    pub(crate) const S: u32 = 0;
    pub(crate) const A: u32 = 1;
    pub(crate) const B: u32 = 2;
    pub(crate) const E: u32 = 3;

    pub(crate) fn diamond() -> TestGraph {
        TestGraph::from_edges(&[(S, A, 1.0), (S, B, 4.0), (A, E, 1.0), (B, E, 1.0)])
    }

    #[test]
    fn reconstruct() {
        let parents = HashMap::from([(3, 2), (2, 1), (1, 0)]);
        assert_eq!(reconstruct_path(&parents, 3), vec![0, 1, 2, 3]);
        assert_eq!(reconstruct_path(&parents, 0), vec![0]);
    }
}
