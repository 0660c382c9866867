// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::astar::DEFAULT_WEIGHT_EPSILON;
use crate::{Weight, WorldGraphMode, DEFAULT_STEP_LIMIT};

/// Knobs of a [Router](crate::Router) and its [WorldGraph](crate::WorldGraph).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingSettings {
    pub mode: WorldGraphMode,

    /// Use the bidirectional A* instead of the unidirectional one.
    pub bidirectional: bool,

    /// Maximum number of vertex expansions of a single search.
    pub step_limit: usize,

    /// Added to every transition between regions of different groups,
    /// see [WorldGraph::cross_border_penalty](crate::WorldGraph::cross_border_penalty).
    pub cross_border_penalty: Weight,

    /// Restrict the detailed search to the chain of regions found over
    /// the [CrossBorderGraph](crate::CrossBorderGraph), if one is attached.
    pub use_leaps: bool,

    /// How many parents of each wave are replayed when two waves of
    /// a bidirectional search meet.
    pub wave_window: usize,

    pub weight_epsilon: Weight,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            mode: WorldGraphMode::default(),
            bidirectional: true,
            step_limit: DEFAULT_STEP_LIMIT,
            cross_border_penalty: 60.0,
            use_leaps: true,
            wave_window: 3,
            weight_epsilon: DEFAULT_WEIGHT_EPSILON,
        }
    }
}
