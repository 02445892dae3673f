use std::time::{Duration, Instant};

/// Re-arming elapsed-time gate on the monotonic clock.
///
/// On trigger the reference point moves to the observed `now`, not to the
/// previous deadline plus the interval, so missed periods are absorbed
/// rather than queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalGate {
    interval: Duration,
    /// None until the first trigger of a primed gate
    last_trigger: Option<Instant>,
}

impl IntervalGate {
    /// Gate whose first trigger comes one full interval after `now`
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_trigger: Some(now),
        }
    }

    /// Gate that triggers on its first check
    pub fn primed(interval: Duration) -> Self {
        Self {
            interval,
            last_trigger: None,
        }
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    /// True once `interval` has passed since the last trigger; re-arms to
    /// `now` when it returns true and leaves the gate untouched otherwise
    pub fn has_elapsed(&mut self, now: Instant) -> bool {
        let due = match self.last_trigger {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if due {
            self.last_trigger = Some(now);
        }
        due
    }

    /// Time left until the gate next triggers
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_trigger {
            None => Duration::ZERO,
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }
}
