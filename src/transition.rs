// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{IndexGraph, NumMwmId, RoadGeometryProvider, RoadPoint, Segment};

/// Table of twin segments stitching regions together.
///
/// A transition leads from an exit segment of one region to an enter segment of another
/// region, where the exit's front point and the enter's back point are the same place.
/// Immutable once built, and shared between searches.
#[derive(Debug, Clone, Default)]
pub struct CrossMwmTransitions {
    outgoing: HashMap<Segment, Vec<Segment>>,
    ingoing: HashMap<Segment, Vec<Segment>>,
    border_points: HashSet<(NumMwmId, RoadPoint)>,
    len: usize,
}

impl CrossMwmTransitions {
    /// Registers a transition from `exit` onto `enter`. Duplicates are ignored.
    pub fn add(&mut self, exit: Segment, enter: Segment) {
        debug_assert_ne!(exit.mwm_id, enter.mwm_id);

        let twins = self.outgoing.entry(exit).or_default();
        if twins.contains(&enter) {
            return;
        }
        twins.push(enter);
        self.ingoing.entry(enter).or_default().push(exit);

        self.border_points.insert((exit.mwm_id, exit.road_point(true)));
        self.border_points.insert((enter.mwm_id, enter.road_point(false)));
        self.len += 1;
    }

    /// Registers a road crossing the border: `exit` leads onto `enter` and,
    /// if the road is `bidirectional`, the reversed `enter` leads onto the reversed `exit`.
    pub fn add_road_crossing(&mut self, exit: Segment, enter: Segment, bidirectional: bool) {
        self.add(exit, enter);
        if bidirectional {
            self.add(enter.reversed(), exit.reversed());
        }
    }

    /// Segments of other regions following (`is_outgoing`) or preceding `segment`.
    pub fn twins(&self, segment: &Segment, is_outgoing: bool) -> &[Segment] {
        let table = if is_outgoing {
            &self.outgoing
        } else {
            &self.ingoing
        };
        table.get(segment).map_or(&[], |v| v.as_slice())
    }

    pub fn is_transition(&self, segment: &Segment, is_outgoing: bool) -> bool {
        !self.twins(segment, is_outgoing).is_empty()
    }

    /// Checks if some transition leaves or enters a region at the given road point.
    pub fn is_border_point(&self, mwm_id: NumMwmId, rp: &RoadPoint) -> bool {
        self.border_points.contains(&(mwm_id, *rp))
    }

    /// All `(exit, enter)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Segment, Segment)> + '_ {
        self.outgoing
            .iter()
            .flat_map(|(&exit, enters)| enters.iter().map(move |&enter| (exit, enter)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stitches all regions of `geometry` wherever roads of different regions share a point:
    /// every segment of one region ending at such a point leads onto every segment
    /// of another region starting there.
    pub fn detect(geometry: &dyn RoadGeometryProvider) -> Self {
        let mut by_position: BTreeMap<(i32, i32), Vec<(NumMwmId, RoadPoint)>> = BTreeMap::default();

        for mwm_id in geometry.regions() {
            for feature_id in 0..geometry.road_count(mwm_id) {
                let Some(road) = geometry.road(mwm_id, feature_id) else {
                    continue;
                };
                if !road.is_routable() {
                    continue;
                }

                for (point_id, point) in road.points.iter().enumerate() {
                    by_position
                        .entry(point.grid_key())
                        .or_default()
                        .push((mwm_id, RoadPoint::new(feature_id, point_id as u32)));
                }
            }
        }

        let mut t = Self::default();
        for points in by_position.values() {
            let Some(&(first_region, _)) = points.first() else {
                continue;
            };
            if points.iter().all(|&(mwm_id, _)| mwm_id == first_region) {
                continue;
            }

            for &(exit_region, exit_rp) in points {
                for &(enter_region, enter_rp) in points {
                    if exit_region == enter_region {
                        continue;
                    }
                    t.add_point_crossings(geometry, (exit_region, exit_rp), (enter_region, enter_rp));
                }
            }
        }

        log::debug!("detected {} cross-region transitions", t.len());
        return t;
    }

    fn add_point_crossings(
        &mut self,
        geometry: &dyn RoadGeometryProvider,
        (exit_region, exit_rp): (NumMwmId, RoadPoint),
        (enter_region, enter_rp): (NumMwmId, RoadPoint),
    ) {
        let (Some(exit_road), Some(enter_road)) = (
            geometry.road(exit_region, exit_rp.feature_id),
            geometry.road(enter_region, enter_rp.feature_id),
        ) else {
            return;
        };

        let exits = IndexGraph::adjacent_segments(exit_region, exit_rp, exit_road, false);
        let enters = IndexGraph::adjacent_segments(enter_region, enter_rp, enter_road, true);
        for exit in exits.into_iter().flatten() {
            for enter in enters.into_iter().flatten() {
                self.add(exit, enter);
            }
        }
    }
}
