// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Recommended number of allowed vertex expansions in [find_path](super::find_path) and
/// [find_path_bidirectional](super::find_path_bidirectional)
/// before [AStarError::StepLimitExceeded] is returned.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// Broken bookkeeping inside a graph implementation. Always a bug, never a data problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InvariantViolation(pub String);

/// Error conditions which may occur during [find_path](super::find_path) or
/// [find_path_bidirectional](super::find_path_bidirectional).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AStarError {
    /// The whole reachable part of the graph was explored without reaching the finish.
    #[error("no path")]
    NoPath,

    /// The search was cancelled by its [Cancellable](super::Cancellable),
    /// either explicitly or because the deadline has passed.
    #[error("search cancelled")]
    Cancelled,

    /// Route search has exceeded its limit of steps.
    /// Either the vertices are really far apart, or no route exists.
    ///
    /// Concluding that no route exists requires traversing the whole graph,
    /// which can result in a denial-of-service. The step limit protects
    /// against resource exhaustion.
    #[error("step limit exceeded")]
    StepLimitExceeded,

    /// The searched graph reported broken internal state.
    #[error("internal error: {0}")]
    Invariant(#[from] InvariantViolation),
}
