use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::clock::Clock;

/// Single-shot countdown measured against a [`Clock`].
///
/// Arming always replaces the previous deadline, so an earlier arming can never
/// elapse after a re-arm. Elapse is observed by calling [`Countdown::poll`] from
/// the event loop; it reports `true` exactly once per arming.
pub struct Countdown {
    clock: Arc<dyn Clock>,
    interval: Duration,
    deadline: Option<NaiveDateTime>,
}

impl Countdown {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            interval: Duration::zero(),
            deadline: None,
        }
    }

    /// Negative intervals are treated as zero.
    pub fn arm(&mut self, interval: Duration) {
        let interval = interval.max(Duration::zero());
        self.interval = interval;
        self.deadline = self.clock.now().checked_add_signed(interval);
    }

    pub fn arm_until(&mut self, deadline: NaiveDateTime) {
        let now = self.clock.now();
        self.interval = (deadline - now).max(Duration::zero());
        self.deadline = Some(deadline.max(now));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn remaining(&self) -> Option<Duration> {
        let deadline = self.deadline?;
        Some((deadline - self.clock.now()).max(Duration::zero()))
    }

    pub fn poll(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if self.clock.now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
