// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{NumMwmId, Segment};

/// Which end of a route an invisible joint stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ending {
    Start,
    End,
}

/// Vertex of the joint graph searched by a [JointGraphStarter](crate::JointGraphStarter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JointSegment {
    /// Traversal of a whole road stretch between two joints: segments
    /// `start_segment_id` through `end_segment_id` of one feature, in travel order.
    Real {
        mwm_id: NumMwmId,
        feature_id: u32,
        forward: bool,
        start_segment_id: u32,
        end_segment_id: u32,
    },

    /// Short chain of raw segments connecting the start or the end of a route
    /// with the nearest joint. The chain itself is kept by the starter which created it.
    Fake(u32),

    /// Zero-cost loop around the literal start or end segment of a route.
    Invisible(Ending),
}

impl JointSegment {
    /// Loop around the start segment of a route.
    pub const START: Self = Self::Invisible(Ending::Start);

    /// Loop around the end segment of a route.
    pub const END: Self = Self::Invisible(Ending::End);

    /// Joint segment spanning `start` to `end`, which must lie on the same feature
    /// and have the same direction, with `end` not before `start` in travel order.
    pub fn real(start: &Segment, end: &Segment) -> Self {
        debug_assert_eq!(start.mwm_id, end.mwm_id);
        debug_assert_eq!(start.feature_id, end.feature_id);
        debug_assert_eq!(start.forward, end.forward);
        debug_assert!(
            (start.forward && start.segment_idx <= end.segment_idx)
                || (!start.forward && start.segment_idx >= end.segment_idx)
        );

        Self::Real {
            mwm_id: start.mwm_id,
            feature_id: start.feature_id,
            forward: start.forward,
            start_segment_id: start.segment_idx,
            end_segment_id: end.segment_idx,
        }
    }

    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real { .. })
    }

    #[inline]
    pub fn is_fake(&self) -> bool {
        matches!(self, Self::Fake(_))
    }

    #[inline]
    pub fn is_invisible(&self) -> bool {
        matches!(self, Self::Invisible(_))
    }

    /// First (`start == true`) or last raw segment of a real joint segment.
    pub fn segment(&self, start: bool) -> Option<Segment> {
        match *self {
            Self::Real {
                mwm_id,
                feature_id,
                forward,
                start_segment_id,
                end_segment_id,
            } => {
                let idx = if start {
                    start_segment_id
                } else {
                    end_segment_id
                };
                Some(Segment::new(mwm_id, feature_id, idx, forward))
            }
            _ => None,
        }
    }

    /// All raw segments of a real joint segment, in travel order.
    /// Empty for fake and invisible joints.
    pub fn segments(&self) -> Vec<Segment> {
        let Self::Real {
            mwm_id,
            feature_id,
            forward,
            start_segment_id,
            end_segment_id,
        } = *self
        else {
            return Vec::new();
        };

        let make = |idx| Segment::new(mwm_id, feature_id, idx, forward);
        if forward {
            (start_segment_id..=end_segment_id).map(make).collect()
        } else {
            (end_segment_id..=start_segment_id).rev().map(make).collect()
        }
    }
}

impl std::fmt::Display for JointSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real {
                mwm_id,
                feature_id,
                forward,
                start_segment_id,
                end_segment_id,
            } => write!(
                f,
                "JointSegment(mwm {}, feature {}, {}..={}, {})",
                mwm_id,
                feature_id,
                start_segment_id,
                end_segment_id,
                if *forward { "fwd" } else { "bwd" }
            ),
            Self::Fake(id) => write!(f, "JointSegment(fake {})", id),
            Self::Invisible(Ending::Start) => f.write_str("JointSegment(start)"),
            Self::Invisible(Ending::End) => f.write_str("JointSegment(end)"),
        }
    }
}

/// Raw segments bracketing a fake [JointSegment]: one of them is the start or the end
/// of the route, the other one is adjacent to a real joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeJointSegment {
    pub start: Segment,
    pub end: Segment,
}

impl FakeJointSegment {
    #[inline]
    pub const fn new(start: Segment, end: Segment) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn segment(&self, start: bool) -> Segment {
        if start {
            self.start
        } else {
            self.end
        }
    }
}
