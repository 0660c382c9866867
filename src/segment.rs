// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::NumMwmId;

/// Position on a specific road: index of a point in the road's geometry.
///
/// Only meaningful within a single region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadPoint {
    pub feature_id: u32,
    pub point_id: u32,
}

impl RoadPoint {
    #[inline]
    pub const fn new(feature_id: u32, point_id: u32) -> Self {
        Self {
            feature_id,
            point_id,
        }
    }
}

/// One directed traversal of an edge of the raw road graph: the stretch between points
/// `segment_idx` and `segment_idx + 1` of a road, travelled forward (in the order of
/// points) or backward.
///
/// Field order defines the total ordering: region, feature, direction, segment index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub mwm_id: NumMwmId,
    pub feature_id: u32,
    pub forward: bool,
    pub segment_idx: u32,
}

impl Segment {
    #[inline]
    pub const fn new(mwm_id: NumMwmId, feature_id: u32, segment_idx: u32, forward: bool) -> Self {
        Self {
            mwm_id,
            feature_id,
            forward,
            segment_idx,
        }
    }

    /// Index of the point where the traversal ends (`front == true`)
    /// or starts (`front == false`).
    #[inline]
    pub fn point_id(&self, front: bool) -> u32 {
        if self.forward == front {
            self.segment_idx + 1
        } else {
            self.segment_idx
        }
    }

    #[inline]
    pub fn road_point(&self, front: bool) -> RoadPoint {
        RoadPoint::new(self.feature_id, self.point_id(front))
    }

    /// The same edge travelled in the opposite direction.
    #[inline]
    pub fn reversed(&self) -> Self {
        Self {
            forward: !self.forward,
            ..*self
        }
    }

    /// Returns the following segment of the same road in the same direction,
    /// or [None] if this segment ends at the last point of a road with `segment_count` segments.
    pub fn next(&self, segment_count: u32) -> Option<Self> {
        let segment_idx = if self.forward {
            self.segment_idx.checked_add(1).filter(|&i| i < segment_count)?
        } else {
            self.segment_idx.checked_sub(1)?
        };
        Some(Self {
            segment_idx,
            ..*self
        })
    }

    /// Returns the preceding segment of the same road in the same direction,
    /// or [None] if this segment starts at the first point of a road with `segment_count` segments.
    pub fn previous(&self, segment_count: u32) -> Option<Self> {
        let segment_idx = if self.forward {
            self.segment_idx.checked_sub(1)?
        } else {
            self.segment_idx.checked_add(1).filter(|&i| i < segment_count)?
        };
        Some(Self {
            segment_idx,
            ..*self
        })
    }

    /// Moves one segment along the road: forward with `outgoing`, backward otherwise.
    #[inline]
    pub fn step(&self, outgoing: bool, segment_count: u32) -> Option<Self> {
        if outgoing {
            self.next(segment_count)
        } else {
            self.previous(segment_count)
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Segment(mwm {}, feature {}, idx {}, {})",
            self.mwm_id,
            self.feature_id,
            self.segment_idx,
            if self.forward { "fwd" } else { "bwd" }
        )
    }
}
