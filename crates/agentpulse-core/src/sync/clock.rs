//! Time sources for the pulse core

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic time for the decay timer.
///
/// Relative timestamps are rendered by consumers against their own wall
/// clock; the core only needs deadlines.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic time
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio runtime.
///
/// Follows tokio's paused clock in tests, so decay deadlines line up with
/// `tokio::time::sleep_until`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeClock;

impl Clock for RuntimeClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Manually advanced clock for deterministic tests
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_only_moves_when_advanced() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.now() - start, Duration::from_millis(1_500));

        // Clones share the same time
        let other = clock.clone();
        other.advance(Duration::from_secs(1));
        assert_eq!(clock.now() - start, Duration::from_millis(2_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_clock_follows_paused_time() {
        let clock = RuntimeClock;
        let start = clock.now();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(clock.now() - start >= Duration::from_secs(2));
    }
}
