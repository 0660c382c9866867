// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use super::cancel::PeriodicPoll;
use super::{reconstruct_path, AStarError, AStarGraph, Params, RoutingResult, WeightedEdge};
use crate::Weight;

#[derive(Debug, Clone, Copy)]
struct FlatQueueItem<V> {
    at: V,
    cost: Weight,
    score: Weight,
}

impl<V> PartialEq for FlatQueueItem<V> {
    fn eq(&self, other: &Self) -> bool {
        self.score.eq(&other.score)
    }
}

impl<V> PartialOrd for FlatQueueItem<V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Eq for FlatQueueItem<V> {}

impl<V> Ord for FlatQueueItem<V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower scores are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other.score.total_cmp(&self.score)
    }
}

/// Uses the [A* algorithm](https://en.wikipedia.org/wiki/A*_search_algorithm)
/// to find the shortest path between two vertices of the provided graph,
/// expanding only outgoing edges.
///
/// Returns [AStarError::NoPath] if the finish can't be reached from the start.
///
/// `params.step_limit` limits how many vertices may be expanded during the search
/// before returning [AStarError::StepLimitExceeded]. Concluding that no route exists requires
/// expanding all vertices accessible from the start, which is usually very time-consuming,
/// especially on large datasets. The recommended value is [DEFAULT_STEP_LIMIT](super::DEFAULT_STEP_LIMIT).
pub fn find_path<G: AStarGraph>(
    graph: &mut G,
    mut params: Params<'_, G::Vertex>,
) -> Result<RoutingResult<G::Vertex>, AStarError> {
    let start = params.start;
    let finish = params.finish;

    let mut queue: BinaryHeap<FlatQueueItem<G::Vertex>> = BinaryHeap::default();
    let mut came_from: HashMap<G::Vertex, G::Vertex> = HashMap::default();
    let mut known_costs: HashMap<G::Vertex, Weight> = HashMap::default();
    let mut edges: Vec<WeightedEdge<G::Vertex>> = Vec::default();
    let mut poll = PeriodicPoll::new(params.cancellable);
    let mut steps: usize = 0;

    queue.push(FlatQueueItem {
        at: start,
        cost: 0.0,
        score: graph.heuristic_cost_estimate(&start, &finish),
    });
    known_costs.insert(start, 0.0);

    while let Some(item) = queue.pop() {
        if poll.is_cancelled() {
            return Err(AStarError::Cancelled);
        }

        if item.at == finish {
            return Ok(RoutingResult {
                path: reconstruct_path(&came_from, finish),
                distance: item.cost,
            });
        }

        // Contrary to the wikipedia definition, we might keep multiple items in the queue for the same vertex.
        if item.cost > known_costs.get(&item.at).cloned().unwrap_or(Weight::INFINITY) {
            continue;
        }

        steps += 1;
        if steps > params.step_limit {
            return Err(AStarError::StepLimitExceeded);
        }

        if let Some(progress) = params.progress.as_deref_mut() {
            if let Some(point) = graph.vertex_point(&item.at) {
                progress.visit(point, true);
            }
        }

        edges.clear();
        graph.get_edge_list(&item.at, true, &mut edges)?;

        for &WeightedEdge { target, weight } in &edges {
            // Check if this is the cheapest way to the neighbor
            let neighbor_cost = item.cost + weight;
            if neighbor_cost
                >= known_costs
                    .get(&target)
                    .cloned()
                    .unwrap_or(Weight::INFINITY)
            {
                continue;
            }

            // Push the new item into the queue
            came_from.insert(target, item.at);
            known_costs.insert(target, neighbor_cost);
            queue.push(FlatQueueItem {
                at: target,
                cost: neighbor_cost,
                score: neighbor_cost + graph.heuristic_cost_estimate(&target, &finish),
            });
        }
    }

    return Err(AStarError::NoPath);
}

#[cfg(test)]
mod tests {
    use super::super::tests::{diamond, TestGraph, A, B, E, S};
    use super::*;
    use crate::Cancellable;

    #[test]
    fn diamond_prefers_cheaper_branch() {
        let mut g = diamond();
        let c = Cancellable::default();
        let r = find_path(&mut g, Params::new(S, E, &c)).unwrap();
        assert_eq!(r.path, vec![S, A, E]);
        assert_eq!(r.distance, 2.0);
    }

    #[test]
    fn no_path() {
        let mut g = TestGraph::from_edges(&[(S, A, 1.0), (B, E, 1.0)]);
        let c = Cancellable::default();
        assert_eq!(find_path(&mut g, Params::new(S, E, &c)), Err(AStarError::NoPath));
    }

    #[test]
    fn pre_cancelled() {
        let mut g = diamond();
        let c = Cancellable::default();
        c.cancel();
        assert_eq!(find_path(&mut g, Params::new(S, E, &c)), Err(AStarError::Cancelled));
    }

    #[test]
    fn step_limit() {
        let mut g = diamond();
        let c = Cancellable::default();
        let mut params = Params::new(S, E, &c);
        params.step_limit = 1;
        assert_eq!(find_path(&mut g, params), Err(AStarError::StepLimitExceeded));
    }

    #[test]
    fn start_is_finish() {
        let mut g = diamond();
        let c = Cancellable::default();
        let r = find_path(&mut g, Params::new(B, B, &c)).unwrap();
        assert_eq!(r.path, vec![B]);
        assert_eq!(r.distance, 0.0);
    }
}
