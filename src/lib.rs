// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Multi-region road routing over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! The road network is partitioned into independently loaded regions. Each region is
//! turned lazily into an [IndexGraph] of directed raw [Segments](Segment), regions are
//! stitched together through a [CrossMwmTransitions] table, and the [Router] runs a
//! bidirectional A* over "joints": whole road stretches between two intersections,
//! collapsed into single search vertices.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! let mut geometry = crossroute::RoadGeometry::default();
//! let options = crossroute::osm::Options {
//!     model: &crossroute::osm::CAR_MODEL,
//!     file_format: crossroute::osm::FileFormat::Unknown,
//!     bbox: [0.0; 4],
//! };
//! crossroute::osm::add_region_from_file(&mut geometry, "Monaco", &options, "monaco.osm")
//!     .expect("failed to load monaco.osm");
//!
//! let geometry = Arc::new(geometry);
//! let transitions = Arc::new(crossroute::CrossMwmTransitions::detect(geometry.as_ref()));
//! let estimator = crossroute::EdgeEstimator::new(
//!     crossroute::WeightKind::Time,
//!     crossroute::osm::CAR_MODEL.max_speed_kmph(),
//! );
//! let settings = crossroute::RoutingSettings::default();
//! let world = crossroute::WorldGraph::new(geometry.clone(), transitions, estimator, &settings);
//! let index = crossroute::kd::RoadIndex::build(geometry.as_ref()).expect("no roads loaded");
//!
//! let mut router = crossroute::Router::new(world, settings);
//! let route = router
//!     .find_route_between_points(
//!         &index,
//!         crossroute::LatLon::new(43.7384, 7.4246),
//!         crossroute::LatLon::new(43.7478, 7.4323),
//!         &crossroute::Cancellable::default(),
//!     )
//!     .expect("failed to find route");
//!
//! println!("Route: {:?}", route.segments);
//! ```

/// Reports a broken internal invariant: logs the problem, fires a debug assertion
/// and evaluates to an [InvariantViolation](crate::astar::InvariantViolation).
macro_rules! invariant_violation {
    ($($arg:tt)+) => {{
        let message = format!($($arg)+);
        log::error!("invariant violated: {}", message);
        debug_assert!(false, "{}", message);
        $crate::astar::InvariantViolation(message)
    }};
}

/// Returns an [InvariantViolation](crate::astar::InvariantViolation) from the enclosing
/// function unless the condition holds.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(invariant_violation!($($arg)+));
        }
    };
}

#[cfg(test)]
#[macro_use]
mod test_fixtures;

pub mod astar;
pub mod cross_border;
mod distance;
mod estimator;
mod index_graph;
mod joint;
pub mod kd;
mod leaps;
pub mod osm;
mod progress;
mod restriction;
mod road;
mod router;
mod segment;
mod settings;
mod starter;
mod transition;
mod world_graph;

pub use astar::{AStarError, AStarGraph, Cancellable, WeightedEdge, DEFAULT_STEP_LIMIT};
pub use cross_border::{CrossBorderError, CrossBorderGraph, CrossBorderSegment, CrossBorderSegmentEnding};
pub use distance::earth_distance;
pub use estimator::{EdgeEstimator, WeightKind};
pub use index_graph::{IndexGraph, JointId};
pub use joint::{Ending, FakeJointSegment, JointSegment};
pub use leaps::{LeapVertex, RegionsSparseGraph};
pub use progress::AStarProgress;
pub use restriction::{Restriction, RestrictionKind};
pub use road::{RoadAccess, RoadGeometry, RoadGeometryProvider, RoadInfo};
pub use router::{FailureReason, Route, Router};
pub use segment::{RoadPoint, Segment};
pub use settings::RoutingSettings;
pub use starter::JointGraphStarter;
pub use transition::CrossMwmTransitions;
pub use world_graph::{WorldGraph, WorldGraphMode};

/// Numeric identifier of a loaded region (an "mwm"), unique within one [RoadGeometry].
pub type NumMwmId = u16;

/// Cost of traversing a part of the road network: seconds for
/// [WeightKind::Time], meters for [WeightKind::Distance].
pub type Weight = f64;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns the position snapped to a 1e-7° grid. Two road points are
    /// considered to be the same place iff their keys are equal.
    #[inline]
    pub fn grid_key(&self) -> (i32, i32) {
        (
            (self.lat * 1e7).round() as i32,
            (self.lon * 1e7).round() as i32,
        )
    }
}

impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.7}, {:.7})", self.lat, self.lon)
    }
}
