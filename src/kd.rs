// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::index_graph::IndexGraph;
use crate::{earth_distance, LatLon, NumMwmId, RoadGeometryProvider, RoadPoint, Segment};

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// used to speed up nearest-neighbor search over road points.
///
/// This implementation assumes euclidean geometry, even though the distance function
/// used is [earth_distance]. This results in undefined behavior when points
/// are close to the ante meridian (180°/-180° longitude) or poles (90°/-90° latitude),
/// or when the data spans multiple continents.
#[derive(Debug, Clone)]
struct KDTree {
    pivot: LatLon,
    left: Option<Box<KDTree>>,
    right: Option<Box<KDTree>>,
}

impl KDTree {
    fn find_nearest(&self, to: LatLon, lon_divides: bool) -> (LatLon, f64) {
        // Start by assuming that pivot is the closest
        let mut best = self.pivot;
        let mut best_dist = earth_distance(to, best);

        // Select which branch to recurse into first
        let first_left = if lon_divides {
            to.lon < best.lon
        } else {
            to.lat < best.lat
        };
        let (first, second) = if first_left {
            (&self.left, &self.right)
        } else {
            (&self.right, &self.left)
        };

        // Recurse into the first branch
        if let Some(ref branch) = first {
            let (alt, alt_dist) = branch.find_nearest(to, !lon_divides);
            if alt_dist < best_dist {
                best = alt;
                best_dist = alt_dist;
            }
        }

        // (Optionally) recurse into the second branch
        if let Some(ref branch) = second {
            // A closer point is possible in the second branch if and only if
            // the splitting axis is closer than the current best candidate.
            let axis = if lon_divides {
                LatLon::new(to.lat, self.pivot.lon)
            } else {
                LatLon::new(self.pivot.lat, to.lon)
            };

            if earth_distance(to, axis) < best_dist {
                let (alt, alt_dist) = branch.find_nearest(to, !lon_divides);
                if alt_dist < best_dist {
                    best = alt;
                    best_dist = alt_dist;
                }
            }
        }

        return (best, best_dist);
    }

    fn build(points: &mut [LatLon], lon_divides: bool) -> Option<Self> {
        match points.len() {
            0 => None,
            1 => Some(Self {
                pivot: points[0],
                left: None,
                right: None,
            }),
            _ => {
                if lon_divides {
                    points.sort_by(|a, b| a.lon.total_cmp(&b.lon));
                } else {
                    points.sort_by(|a, b| a.lat.total_cmp(&b.lat));
                }
                let median = points.len() / 2;
                let pivot = points[median];
                let (left, right_and_pivot) = points.split_at_mut(median);
                let right = &mut right_and_pivot[1..];
                Some(Self {
                    pivot,
                    left: Self::build(left, !lon_divides).map(Box::new),
                    right: Self::build(right, !lon_divides).map(Box::new),
                })
            }
        }
    }
}

/// Spatial index resolving arbitrary positions to points of routable roads.
///
/// Road points of different roads (and regions) sharing one position are indexed
/// together, so an intersection resolves to all roads crossing it.
#[derive(Debug, Clone)]
pub struct RoadIndex {
    tree: KDTree,
    road_points: HashMap<(i32, i32), Vec<(NumMwmId, RoadPoint)>>,
}

impl RoadIndex {
    /// Indexes every point of every routable road of `geometry`.
    /// Returns [None] if there are no such roads.
    pub fn build(geometry: &dyn RoadGeometryProvider) -> Option<Self> {
        let mut road_points: HashMap<(i32, i32), Vec<(NumMwmId, RoadPoint)>> = HashMap::default();
        let mut positions: Vec<LatLon> = Vec::default();

        for mwm_id in geometry.regions() {
            for feature_id in 0..geometry.road_count(mwm_id) {
                let Some(road) = geometry.road(mwm_id, feature_id) else {
                    continue;
                };
                if !road.is_routable() {
                    continue;
                }

                for (point_id, &point) in road.points.iter().enumerate() {
                    let at = road_points.entry(point.grid_key()).or_default();
                    if at.is_empty() {
                        positions.push(point);
                    }
                    at.push((mwm_id, RoadPoint::new(feature_id, point_id as u32)));
                }
            }
        }

        let tree = KDTree::build(positions.as_mut_slice(), false)?;
        log::debug!("indexed {} road positions", positions.len());
        Some(Self { tree, road_points })
    }

    /// Finds the closest road point to the given position.
    pub fn find_nearest(&self, to: LatLon) -> LatLon {
        self.tree.find_nearest(to, false).0
    }

    /// Road points at exactly the given (indexed) position.
    pub fn road_points_at(&self, at: LatLon) -> &[(NumMwmId, RoadPoint)] {
        self.road_points
            .get(&at.grid_key())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolves a position to its nearest road point, and returns that point with all
    /// traversable segments leaving (`outgoing`) or arriving at it.
    pub fn candidates(
        &self,
        geometry: &dyn RoadGeometryProvider,
        to: LatLon,
        outgoing: bool,
    ) -> (LatLon, Vec<Segment>) {
        let nearest = self.find_nearest(to);
        let mut segments = Vec::default();

        for &(mwm_id, rp) in self.road_points_at(nearest) {
            let Some(road) = geometry.road(mwm_id, rp.feature_id) else {
                continue;
            };
            segments.extend(
                IndexGraph::adjacent_segments(mwm_id, rp, road, outgoing)
                    .into_iter()
                    .flatten(),
            );
        }

        (nearest, segments)
    }
}
