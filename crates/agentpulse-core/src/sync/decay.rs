//! Re-armable decay timer for the "just arrived" signal

use std::time::{Duration, Instant};

/// Deadline-based timer owned by the sync core.
///
/// The timer holds no task of its own; whoever drives the core sleeps until
/// [`DecayTimer::deadline`] and then asks the core to expire it.
#[derive(Debug, Clone)]
pub struct DecayTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl DecayTimer {
    /// Create an unarmed timer
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Length of the decay window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Arm (or re-arm) the timer from `now`, returning the new deadline
    pub fn arm(&mut self, now: Instant) -> Instant {
        let deadline = now + self.window;
        self.deadline = Some(deadline);
        deadline
    }

    /// Disarm the timer. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Pending deadline, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the timer is armed
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether an armed timer has reached its deadline at `now`
    pub fn expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
