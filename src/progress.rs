// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::{earth_distance, LatLon};

/// Highest percentage reported before a search finishes.
const MAX_PERCENT: f64 = 99.0;

/// Turns positions of visited vertices into an approximate completion percentage.
///
/// Each wave contributes the share of the start-finish distance it has closed:
/// the forward wave by getting closer to the finish, the backward wave by getting
/// closer to the start. The reported value never decreases and stays within `[0, 99]`
/// until [AStarProgress::finish] is called.
pub struct AStarProgress {
    start: LatLon,
    finish: LatLon,
    total: f64,
    forward_closed: f64,
    backward_closed: f64,
    last_reported: f64,
    callback: Option<Box<dyn FnMut(f64) + Send>>,
}

impl AStarProgress {
    pub fn new(start: LatLon, finish: LatLon) -> Self {
        Self {
            start,
            finish,
            total: earth_distance(start, finish),
            forward_closed: 0.0,
            backward_closed: 0.0,
            last_reported: 0.0,
            callback: None,
        }
    }

    /// Sets a function to be called whenever the percentage increases.
    pub fn with_callback<F: FnMut(f64) + Send + 'static>(mut self, callback: F) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn percent(&self) -> f64 {
        self.last_reported
    }

    /// Records a vertex visited by the forward (`forward == true`) or backward wave.
    pub fn visit(&mut self, point: LatLon, forward: bool) {
        if self.total <= 0.0 {
            return;
        }

        if forward {
            let closed = self.total - earth_distance(point, self.finish);
            self.forward_closed = self.forward_closed.max(closed);
        } else {
            let closed = self.total - earth_distance(point, self.start);
            self.backward_closed = self.backward_closed.max(closed);
        }

        let percent =
            (100.0 * (self.forward_closed + self.backward_closed) / self.total).clamp(0.0, MAX_PERCENT);

        if percent > self.last_reported {
            self.last_reported = percent;
            if let Some(callback) = self.callback.as_mut() {
                callback(percent);
            }
        }
    }

    /// Reports completion of the search; the only way to reach 100%.
    pub fn finish(&mut self) {
        if self.last_reported < 100.0 {
            self.last_reported = 100.0;
            if let Some(callback) = self.callback.as_mut() {
                callback(100.0);
            }
        }
    }
}

impl std::fmt::Debug for AStarProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AStarProgress")
            .field("start", &self.start)
            .field("finish", &self.finish)
            .field("percent", &self.last_reported)
            .finish()
    }
}
