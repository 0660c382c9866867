// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use super::cancel::PeriodicPoll;
use super::{reconstruct_path, AStarError, AStarGraph, Params, RoutingResult, WeightedEdge};
use crate::Weight;

/// Number of dequeues after which the search switches to the other wave.
const QUEUE_SWITCH_PERIOD: usize = 128;

#[derive(Debug, Clone, Copy)]
struct State<V> {
    vertex: V,
    /// Reduced distance from the origin of the wave.
    distance: Weight,
    /// Value of the consistent heuristic at `vertex`.
    heuristic: Weight,
}

impl<V> PartialEq for State<V> {
    fn eq(&self, other: &Self) -> bool {
        self.distance.eq(&other.distance)
    }
}

impl<V> PartialOrd for State<V> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Eq for State<V> {}

impl<V> Ord for State<V> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap and shorter distances go first.
        other.distance.total_cmp(&self.distance)
    }
}

/// Everything related to one of the two waves.
struct StepContext<V> {
    forward: bool,
    origin: V,
    target: V,
    queue: BinaryHeap<State<V>>,
    best_distance: HashMap<V, Weight>,
    parents: HashMap<V, V>,
    best_vertex: V,
    potential_at_origin: Weight,
}

impl<V: Copy + Eq + Hash> StepContext<V> {
    fn new<G: AStarGraph<Vertex = V>>(graph: &G, forward: bool, origin: V, target: V) -> Self {
        let mut ctx = Self {
            forward,
            origin,
            target,
            queue: BinaryHeap::default(),
            best_distance: HashMap::default(),
            parents: HashMap::default(),
            best_vertex: origin,
            potential_at_origin: 0.0,
        };

        let heuristic = ctx.consistent_heuristic(graph, &origin);
        ctx.potential_at_origin = heuristic;
        ctx.best_distance.insert(origin, 0.0);
        ctx.queue.push(State {
            vertex: origin,
            distance: 0.0,
            heuristic,
        });
        ctx
    }

    /// Average of the forward and the reverse heuristics, which makes the reduced
    /// weights of both waves agree with each other: p_f(v) = -p_r(v).
    fn consistent_heuristic<G: AStarGraph<Vertex = V>>(&self, graph: &G, v: &V) -> Weight {
        let to_target = graph.heuristic_cost_estimate(v, &self.target);
        let to_origin = graph.heuristic_cost_estimate(v, &self.origin);
        0.5 * (to_target - to_origin)
    }

    fn top_distance(&self) -> Weight {
        self.queue.peek().map_or(Weight::INFINITY, |s| s.distance)
    }

    fn exists_state_with_better_distance(&self, state: &State<V>, epsilon: Weight) -> bool {
        self.best_distance
            .get(&state.vertex)
            .is_some_and(|&best| state.distance > best - epsilon)
    }
}

/// Builds the result out of the two waves, independently of which one is current.
fn emit<V: Copy + Eq + Hash>(
    a: &StepContext<V>,
    b: &StepContext<V>,
    distance: Weight,
) -> RoutingResult<V> {
    let (forward, backward) = if a.forward { (a, b) } else { (b, a) };
    let mut path = reconstruct_path(&forward.parents, forward.best_vertex);
    let mut tail = reconstruct_path(&backward.parents, backward.best_vertex);
    tail.reverse();
    path.append(&mut tail);
    RoutingResult { path, distance }
}

/// Bidirectional variant of [find_path](super::find_path): two A* waves, one expanding
/// outgoing edges from the start and one expanding ingoing edges from the finish,
/// alternating every 128 steps.
///
/// Both waves run on reduced weights induced by a consistent heuristic, so the
/// search may stop once the two queue tops can't improve on the best meeting found so far.
/// Every candidate meeting point is checked with [AStarGraph::are_waves_connectible].
pub fn find_path_bidirectional<G: AStarGraph>(
    graph: &mut G,
    mut params: Params<'_, G::Vertex>,
) -> Result<RoutingResult<G::Vertex>, AStarError> {
    let start = params.start;
    let finish = params.finish;
    let epsilon = params.weight_epsilon;

    if start == finish {
        return Ok(RoutingResult {
            path: vec![start],
            distance: 0.0,
        });
    }

    let mut forward = StepContext::new(graph, true, start, finish);
    let mut backward = StepContext::new(graph, false, finish, start);

    let mut cur = &mut forward;
    let mut nxt = &mut backward;

    let mut found_any_path = false;
    let mut best_path_reduced_length: Weight = 0.0;
    let mut best_path_real_length: Weight = 0.0;

    let mut adjacency: Vec<WeightedEdge<G::Vertex>> = Vec::default();
    let mut poll = PeriodicPoll::new(params.cancellable);
    let mut steps: usize = 0;

    // Once one of the queues is exhausted without a meeting point, there is no path.
    while !cur.queue.is_empty() && !nxt.queue.is_empty() {
        steps += 1;

        if poll.is_cancelled() {
            return Err(AStarError::Cancelled);
        }

        if steps > params.step_limit {
            return Err(AStarError::StepLimitExceeded);
        }

        if steps % QUEUE_SWITCH_PERIOD == 0 {
            std::mem::swap(&mut cur, &mut nxt);
        }

        // No path shorter than the sum of both tops can be found anymore. Reduced lengths
        // are compared, as several top states may share a reduced length and differ in real length.
        if found_any_path && cur.top_distance() + nxt.top_distance() >= best_path_reduced_length - epsilon {
            return Ok(emit(cur, nxt, best_path_real_length));
        }

        let Some(state_v) = cur.queue.pop() else {
            break;
        };

        if cur.exists_state_with_better_distance(&state_v, 0.0) {
            continue;
        }

        if let Some(progress) = params.progress.as_deref_mut() {
            if let Some(point) = graph.vertex_point(&state_v.vertex) {
                progress.visit(point, cur.forward);
            }
        }

        adjacency.clear();
        graph.get_edge_list(&state_v.vertex, cur.forward, &mut adjacency)?;

        let p_v = state_v.heuristic;
        for &WeightedEdge {
            target: w,
            weight,
        } in &adjacency
        {
            if w == state_v.vertex {
                continue;
            }

            let p_w = cur.consistent_heuristic(graph, &w);
            let reduced_weight = weight + p_w - p_v;
            if reduced_weight < -epsilon {
                log::debug!(
                    "negative reduced weight {} on edge {:?} -> {:?}",
                    reduced_weight,
                    state_v.vertex,
                    w
                );
            }

            let state_w = State {
                vertex: w,
                distance: state_v.distance + reduced_weight.max(0.0),
                heuristic: p_w,
            };

            if cur.exists_state_with_better_distance(&state_w, epsilon) {
                continue;
            }

            cur.best_distance.insert(w, state_w.distance);
            cur.parents.insert(w, state_v.vertex);

            if let Some(&dist_w) = nxt.best_distance.get(&w) {
                let cur_path_reduced_length = state_w.distance + dist_w;

                if !found_any_path || best_path_reduced_length > cur_path_reduced_length {
                    let connectible = {
                        let (forward_parents, backward_parents) = if cur.forward {
                            (&cur.parents, &nxt.parents)
                        } else {
                            (&nxt.parents, &cur.parents)
                        };
                        graph.are_waves_connectible(forward_parents, &w, backward_parents)
                    };

                    if connectible {
                        best_path_reduced_length = cur_path_reduced_length;
                        best_path_real_length = state_v.distance + weight + dist_w
                            + cur.potential_at_origin
                            - p_v
                            + nxt.potential_at_origin
                            - nxt.consistent_heuristic(graph, &w);
                        found_any_path = true;
                        cur.best_vertex = state_v.vertex;
                        nxt.best_vertex = w;
                    }
                }
            }

            if w != cur.target {
                cur.queue.push(state_w);
            }
        }
    }

    if found_any_path {
        return Ok(emit(cur, nxt, best_path_real_length));
    }

    return Err(AStarError::NoPath);
}
