// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::CANCELLATION_POLL_PERIOD;

/// Cancellation signal shared between a running search and whoever may stop it.
///
/// A search is cancelled either by [Cancellable::cancel] or when its deadline passes;
/// both cases are reported identically.
#[derive(Debug, Default)]
pub struct Cancellable {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl Cancellable {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Checks a [Cancellable] only every [CANCELLATION_POLL_PERIOD] calls,
/// starting with the very first one.
pub(super) struct PeriodicPoll<'a> {
    cancellable: &'a Cancellable,
    count: usize,
}

impl<'a> PeriodicPoll<'a> {
    pub(super) fn new(cancellable: &'a Cancellable) -> Self {
        Self {
            cancellable,
            count: 0,
        }
    }

    pub(super) fn is_cancelled(&mut self) -> bool {
        let poll = self.count % CANCELLATION_POLL_PERIOD == 0;
        self.count += 1;
        poll && self.cancellable.is_cancelled()
    }
}
