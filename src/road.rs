// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use crate::{LatLon, NumMwmId, Restriction, Segment};

/// Whether a road may be used for routing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoadAccess {
    #[default]
    Yes,
    No,
}

/// Geometry and routing attributes of a single road (feature) of a region.
///
/// One-way roads are traversable only in the order of their points.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadInfo {
    pub points: Vec<LatLon>,
    pub bidirectional: bool,
    pub speed_kmph: f64,
    pub access: RoadAccess,
}

impl RoadInfo {
    pub fn new(points: Vec<LatLon>, bidirectional: bool, speed_kmph: f64) -> Self {
        Self {
            points,
            bidirectional,
            speed_kmph,
            access: RoadAccess::Yes,
        }
    }

    #[inline]
    pub fn segment_count(&self) -> u32 {
        self.points.len().saturating_sub(1) as u32
    }

    #[inline]
    pub fn point(&self, point_id: u32) -> Option<LatLon> {
        self.points.get(point_id as usize).copied()
    }

    /// Routable roads have at least two points, a positive speed and are accessible.
    pub fn is_routable(&self) -> bool {
        self.points.len() >= 2
            && self.speed_kmph.is_finite()
            && self.speed_kmph > 0.0
            && self.access == RoadAccess::Yes
    }

    /// Checks whether the directed `segment` of this road may be travelled.
    pub fn allows(&self, segment: &Segment) -> bool {
        self.is_routable()
            && segment.segment_idx < self.segment_count()
            && (segment.forward || self.bidirectional)
    }
}

/// Per-region lookup of road geometry and turn restrictions.
///
/// Implementations are shared read-only between concurrent route computations.
pub trait RoadGeometryProvider: Send + Sync {
    /// Identifiers of all loaded regions, in ascending order.
    fn regions(&self) -> Vec<NumMwmId>;

    /// Canonical name of a region, e.g. `Germany_Berlin`.
    fn region_name(&self, mwm_id: NumMwmId) -> Option<&str>;

    /// Number of features in a region; feature ids are `0..road_count`.
    fn road_count(&self, mwm_id: NumMwmId) -> u32;

    fn road(&self, mwm_id: NumMwmId, feature_id: u32) -> Option<&RoadInfo>;

    fn restrictions(&self, mwm_id: NumMwmId) -> &[Restriction];
}

#[derive(Debug, Clone, Default)]
struct Region {
    name: String,
    roads: Vec<RoadInfo>,
    restrictions: Vec<Restriction>,
}

/// In-memory [RoadGeometryProvider], filled by [crate::osm] loaders or by hand.
#[derive(Debug, Clone, Default)]
pub struct RoadGeometry {
    regions: BTreeMap<NumMwmId, Region>,
}

impl RoadGeometry {
    /// Registers a new, empty region and returns its id. Adding a region with a name
    /// which is already known returns the existing id.
    pub fn add_region(&mut self, name: &str) -> NumMwmId {
        if let Some(id) = self.region_id(name) {
            return id;
        }

        let id = self
            .regions
            .last_key_value()
            .map_or(0, |(&id, _)| id.wrapping_add(1));
        self.regions.insert(
            id,
            Region {
                name: name.to_string(),
                ..Region::default()
            },
        );
        return id;
    }

    pub fn region_id(&self, name: &str) -> Option<NumMwmId> {
        self.regions
            .iter()
            .find(|(_, r)| r.name == name)
            .map(|(&id, _)| id)
    }

    /// Appends a road to a region and returns its feature id,
    /// or [None] if the region does not exist.
    pub fn add_road(&mut self, mwm_id: NumMwmId, road: RoadInfo) -> Option<u32> {
        let region = self.regions.get_mut(&mwm_id)?;
        region.roads.push(road);
        Some(region.roads.len() as u32 - 1)
    }

    pub fn add_restriction(&mut self, mwm_id: NumMwmId, restriction: Restriction) -> bool {
        match self.regions.get_mut(&mwm_id) {
            Some(region) => {
                region.restrictions.push(restriction);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regions.values().all(|r| r.roads.is_empty())
    }
}

impl RoadGeometryProvider for RoadGeometry {
    fn regions(&self) -> Vec<NumMwmId> {
        self.regions.keys().copied().collect()
    }

    fn region_name(&self, mwm_id: NumMwmId) -> Option<&str> {
        self.regions.get(&mwm_id).map(|r| r.name.as_str())
    }

    fn road_count(&self, mwm_id: NumMwmId) -> u32 {
        self.regions.get(&mwm_id).map_or(0, |r| r.roads.len() as u32)
    }

    fn road(&self, mwm_id: NumMwmId, feature_id: u32) -> Option<&RoadInfo> {
        self.regions
            .get(&mwm_id)
            .and_then(|r| r.roads.get(feature_id as usize))
    }

    fn restrictions(&self, mwm_id: NumMwmId) -> &[Restriction] {
        self.regions
            .get(&mwm_id)
            .map_or(&[], |r| r.restrictions.as_slice())
    }
}
