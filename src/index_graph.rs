// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::{
    EdgeEstimator, LatLon, NumMwmId, Restriction, RestrictionKind, RoadGeometryProvider, RoadInfo,
    RoadPoint, Segment, WeightedEdge,
};

/// Identifier of a group of road points which share one position, within one [IndexGraph].
pub type JointId = u32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
enum InvalidRestriction {
    #[error("reference to unknown or unroutable road {0}")]
    UnknownRoad(u32),

    #[error("roads {from} and {to} don't meet")]
    Disjoint { from: u32, to: u32 },

    #[error("roads {from} and {to} don't meet at {via}")]
    DisjointAtVia { from: u32, to: u32, via: LatLon },
}

/// Routing structure of a single region.
///
/// Every point of every routable road belongs to exactly one joint: the set of road points
/// sharing its position. Raw edges lead from a segment to the segments starting at the
/// joint where it ends. Only some joints bound joint segments (see [IndexGraph::is_joint]).
#[derive(Debug, Clone, Default)]
pub struct IndexGraph {
    mwm_id: NumMwmId,
    joints: Vec<Vec<RoadPoint>>,
    point_joints: HashMap<RoadPoint, JointId>,
    bounding: Vec<bool>,
    restrictions: HashMap<(u32, JointId), Vec<(RestrictionKind, u32)>>,
}

impl IndexGraph {
    /// Builds the graph of a region out of its roads and restrictions.
    ///
    /// Restrictions referencing missing roads, or roads which don't meet, are logged and skipped.
    pub fn build(mwm_id: NumMwmId, geometry: &dyn RoadGeometryProvider) -> Self {
        let mut g = Self {
            mwm_id,
            ..Self::default()
        };
        let mut by_position: HashMap<(i32, i32), JointId> = HashMap::default();

        for feature_id in 0..geometry.road_count(mwm_id) {
            let Some(road) = geometry.road(mwm_id, feature_id) else {
                continue;
            };
            if !road.is_routable() {
                continue;
            }

            let last_point_id = road.segment_count();
            for (point_id, point) in road.points.iter().enumerate() {
                let rp = RoadPoint::new(feature_id, point_id as u32);
                let joint = *by_position.entry(point.grid_key()).or_insert_with(|| {
                    g.joints.push(Vec::default());
                    g.bounding.push(false);
                    (g.joints.len() - 1) as JointId
                });

                g.joints[joint as usize].push(rp);
                g.point_joints.insert(rp, joint);

                // Road ends (dead ends included) always bound a joint segment
                if rp.point_id == 0 || rp.point_id == last_point_id {
                    g.bounding[joint as usize] = true;
                }
            }
        }

        for (joint, points) in g.joints.iter().enumerate() {
            if points.len() > 1 {
                g.bounding[joint] = true;
            }
        }

        for restriction in geometry.restrictions(mwm_id) {
            if let Err(e) = g.add_restriction(geometry, restriction) {
                log::warn!(
                    "region {}: skipping {:?} restriction {} -> {}: {}",
                    mwm_id,
                    restriction.kind,
                    restriction.from,
                    restriction.to,
                    e
                );
            }
        }

        log::debug!(
            "region {}: built index graph with {} joints and {} restricted turns",
            mwm_id,
            g.joints.len(),
            g.restrictions.len()
        );
        return g;
    }

    fn add_restriction(
        &mut self,
        geometry: &dyn RoadGeometryProvider,
        r: &Restriction,
    ) -> Result<(), InvalidRestriction> {
        let from = geometry
            .road(self.mwm_id, r.from)
            .filter(|road| road.is_routable())
            .ok_or(InvalidRestriction::UnknownRoad(r.from))?;
        geometry
            .road(self.mwm_id, r.to)
            .filter(|road| road.is_routable())
            .ok_or(InvalidRestriction::UnknownRoad(r.to))?;

        let via = match r.via {
            Some(at) => self
                .find_via_at(r.from, from, r.to, at)
                .ok_or(InvalidRestriction::DisjointAtVia {
                    from: r.from,
                    to: r.to,
                    via: at,
                })?,
            None => self
                .find_via(r.from, from, r.to)
                .ok_or(InvalidRestriction::Disjoint {
                    from: r.from,
                    to: r.to,
                })?,
        };

        self.restrictions
            .entry((r.from, via))
            .or_default()
            .push((r.kind, r.to));

        // Restricted turns must happen at a joint segment boundary
        self.bounding[via as usize] = true;
        Ok(())
    }

    /// Finds the joint where the `from` road meets the `to` road,
    /// preferring the ends of the `from` road.
    fn find_via(&self, from_id: u32, from: &RoadInfo, to_id: u32) -> Option<JointId> {
        let last = from.segment_count();
        let ends = [0, last];
        let inner = 1..last;

        ends.into_iter()
            .chain(inner)
            .find_map(|point_id| self.meeting_joint(from_id, point_id, last, to_id))
    }

    /// Finds the joint at `at` where the `from` road meets the `to` road.
    fn find_via_at(&self, from_id: u32, from: &RoadInfo, to_id: u32, at: LatLon) -> Option<JointId> {
        let key = at.grid_key();
        let last = from.segment_count();

        from.points
            .iter()
            .enumerate()
            .filter(|(_, point)| point.grid_key() == key)
            .find_map(|(point_id, _)| self.meeting_joint(from_id, point_id as u32, last, to_id))
    }

    /// Returns the joint of the `point_id`-th point of the `from` road,
    /// if the `to` road passes through it too.
    fn meeting_joint(&self, from_id: u32, point_id: u32, last: u32, to_id: u32) -> Option<JointId> {
        let joint = *self.point_joints.get(&RoadPoint::new(from_id, point_id))?;
        let meets = self.joints[joint as usize]
            .iter()
            .any(|rp| rp.feature_id == to_id && !(from_id == to_id && rp.point_id == point_id));
        let is_u_turn_at_end = from_id == to_id && (point_id == 0 || point_id == last);
        if meets || is_u_turn_at_end {
            Some(joint)
        } else {
            None
        }
    }

    #[inline]
    pub fn mwm_id(&self) -> NumMwmId {
        self.mwm_id
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn joint_of(&self, rp: &RoadPoint) -> Option<JointId> {
        self.point_joints.get(rp).copied()
    }

    /// Checks if a road point bounds joint segments: it is shared by more than one road
    /// point, ends a road, or is the via point of a restriction. Unknown points are
    /// treated as joints, so that no joint segment ever extends beyond them.
    pub fn is_joint(&self, rp: &RoadPoint) -> bool {
        self.point_joints
            .get(rp)
            .map_or(true, |&joint| self.bounding[joint as usize])
    }

    /// Checks whether turning from the `from` road onto the `to` road at `via` is forbidden.
    pub fn is_restricted(&self, from: u32, via: JointId, to: u32) -> bool {
        let Some(rules) = self.restrictions.get(&(from, via)) else {
            return false;
        };

        let mut has_only = false;
        for &(kind, target) in rules {
            match kind {
                RestrictionKind::No if target == to => return true,
                RestrictionKind::Only if target == to => return false,
                RestrictionKind::Only => has_only = true,
                RestrictionKind::No => {}
            }
        }
        has_only
    }

    /// Segments of a road which start (`outgoing`) or end (`!outgoing`) at the given road point.
    pub(crate) fn adjacent_segments(
        mwm_id: NumMwmId,
        rp: RoadPoint,
        road: &RoadInfo,
        outgoing: bool,
    ) -> [Option<Segment>; 2] {
        let count = road.segment_count();
        let after = (rp.point_id < count).then_some(rp.point_id);
        let before = rp.point_id.checked_sub(1);

        let (forward_idx, backward_idx) = if outgoing {
            (after, before)
        } else {
            (before, after)
        };

        [
            forward_idx.map(|idx| Segment::new(mwm_id, rp.feature_id, idx, true)),
            backward_idx
                .filter(|_| road.bidirectional)
                .map(|idx| Segment::new(mwm_id, rp.feature_id, idx, false)),
        ]
    }

    /// Appends raw edges leaving (`is_outgoing`) or entering `segment` to `edges`.
    ///
    /// The weight of an edge is the weight of the segment it leads to. Turns forbidden by
    /// restrictions are never produced, and turning back onto the same segment is only
    /// offered when there is no other way to go.
    pub fn get_edge_list(
        &self,
        geometry: &dyn RoadGeometryProvider,
        estimator: &EdgeEstimator,
        segment: &Segment,
        is_outgoing: bool,
        edges: &mut Vec<WeightedEdge<Segment>>,
    ) {
        debug_assert_eq!(segment.mwm_id, self.mwm_id);

        let Some(road) = geometry
            .road(self.mwm_id, segment.feature_id)
            .filter(|road| road.allows(segment))
        else {
            log::error!("edges requested for an untraversable {}", segment);
            debug_assert!(false, "edges requested for an untraversable {}", segment);
            return;
        };

        let Some(joint) = self.joint_of(&segment.road_point(is_outgoing)) else {
            return;
        };

        let first_added = edges.len();
        let reversed = segment.reversed();
        let mut u_turn = None;

        for &rp in &self.joints[joint as usize] {
            let Some(other_road) = geometry.road(self.mwm_id, rp.feature_id) else {
                continue;
            };

            for candidate in Self::adjacent_segments(self.mwm_id, rp, other_road, is_outgoing)
                .into_iter()
                .flatten()
            {
                let (from, to) = if is_outgoing {
                    (segment.feature_id, candidate.feature_id)
                } else {
                    (candidate.feature_id, segment.feature_id)
                };
                if self.is_restricted(from, joint, to) {
                    continue;
                }

                let weight = if is_outgoing {
                    estimator.segment_weight(other_road, &candidate)
                } else {
                    estimator.segment_weight(road, segment)
                };

                let edge = WeightedEdge::new(candidate, weight);
                if candidate == reversed {
                    u_turn = Some(edge);
                } else {
                    edges.push(edge);
                }
            }
        }

        // Turning back is decided by the exits of the segment being left,
        // which for ingoing edges is the reversed `segment`.
        if let Some(edge) = u_turn {
            let allowed = if is_outgoing {
                edges.len() == first_added
            } else {
                !self.has_other_exit(geometry, &reversed, joint)
            };
            if allowed {
                edges.push(edge);
            }
        }
    }

    /// Checks if `from` may be left at its end joint without turning back.
    fn has_other_exit(
        &self,
        geometry: &dyn RoadGeometryProvider,
        from: &Segment,
        joint: JointId,
    ) -> bool {
        let back = from.reversed();
        self.joints[joint as usize].iter().any(|&rp| {
            geometry
                .road(self.mwm_id, rp.feature_id)
                .is_some_and(|road| {
                    Self::adjacent_segments(self.mwm_id, rp, road, true)
                        .into_iter()
                        .flatten()
                        .any(|c| c != back && !self.is_restricted(from.feature_id, joint, c.feature_id))
                })
        })
    }
}
