//! Event synchronization core
//!
//! Merges the startup snapshot with streamed inserts into a single "latest
//! event", tracks connection health and drives the "just arrived" signal.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::models::{ConnectionStatus, EventRecord};

use super::clock::{Clock, RuntimeClock};
use super::decay::DecayTimer;
use super::view::PulseView;

/// How long the "just arrived" signal stays up after a new latest event
pub const DEFAULT_DECAY_WINDOW: Duration = Duration::from_secs(2);

/// The only stateful decision-maker of the pulse.
///
/// Snapshot and stream may resolve in any order; both go through the same
/// max-by-`(created_at, id)` rule, so the latest event never regresses.
pub struct EventSyncCore {
    latest: Option<EventRecord>,
    status: ConnectionStatus,
    just_arrived: bool,
    decay: DecayTimer,
    clock: Arc<dyn Clock>,
    pulses: u64,
}

impl fmt::Debug for EventSyncCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSyncCore")
            .field("latest", &self.latest)
            .field("status", &self.status)
            .field("just_arrived", &self.just_arrived)
            .field("decay", &self.decay)
            .field("pulses", &self.pulses)
            .finish_non_exhaustive()
    }
}

impl Default for EventSyncCore {
    fn default() -> Self {
        Self::new(DEFAULT_DECAY_WINDOW)
    }
}

impl EventSyncCore {
    /// Create a core on the runtime clock
    pub fn new(decay_window: Duration) -> Self {
        Self::with_clock(decay_window, Arc::new(RuntimeClock))
    }

    /// Create a core on an explicit clock
    pub fn with_clock(decay_window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            latest: None,
            status: ConnectionStatus::Connecting,
            just_arrived: false,
            decay: DecayTimer::new(decay_window),
            clock,
            pulses: 0,
        }
    }

    /// Apply the startup snapshot.
    ///
    /// A snapshot never displaces a newer record the stream already delivered,
    /// and adopting it does not raise the "just arrived" signal.
    pub fn seed(&mut self, record: Option<EventRecord>) -> bool {
        let Some(record) = record else {
            debug!("Seeded with empty snapshot");
            return false;
        };

        if record.is_newer_than(self.latest.as_ref()) {
            debug!(event_id = %record.id, "Adopted snapshot as latest event");
            self.latest = Some(record);
            true
        } else {
            debug!(event_id = %record.id, "Snapshot superseded by streamed event");
            false
        }
    }

    /// Apply a streamed insert. Returns whether it became the latest event.
    ///
    /// Only a strictly newer record replaces the latest one; replaying the
    /// current record (or anything older) leaves state and timer untouched.
    pub fn observe_inserted(&mut self, record: EventRecord) -> bool {
        if !record.is_newer_than(self.latest.as_ref()) {
            trace!(event_id = %record.id, "Ignoring stale or duplicate insert");
            return false;
        }

        if !self.just_arrived() {
            self.pulses += 1;
        }

        let deadline = self.decay.arm(self.clock.now());
        self.just_arrived = true;

        debug!(
            event_id = %record.id,
            role = record.role().unwrap_or("system"),
            decay_ms = window_millis(self.decay.window()),
            "New latest event"
        );
        trace!(?deadline, "Decay timer armed");

        self.latest = Some(record);
        true
    }

    /// Record the subscription status reported by the channel
    pub fn observe_connection_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            info!(from = ?self.status, to = ?status, "Connection status changed");
        }
        self.status = status;
    }

    /// Expire the "just arrived" signal if its deadline has passed.
    ///
    /// Returns whether the signal was lowered by this call.
    pub fn poll_decay(&mut self) -> bool {
        if !self.decay.expired(self.clock.now()) {
            return false;
        }

        self.decay.cancel();
        let lowered = std::mem::replace(&mut self.just_arrived, false);
        if lowered {
            trace!("Pulse decayed");
        }
        lowered
    }

    /// Cancel the pending decay timer and lower the signal
    pub fn teardown(&mut self) {
        if self.decay.cancel() {
            debug!("Cancelled pending decay timer");
        }
        self.just_arrived = false;
    }

    /// Newest event observed so far
    pub fn latest_event(&self) -> Option<&EventRecord> {
        self.latest.as_ref()
    }

    /// Last reported subscription status
    pub fn connection_status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether the latest event arrived within the decay window
    pub fn just_arrived(&self) -> bool {
        self.just_arrived && !self.decay.expired(self.clock.now())
    }

    /// When the "just arrived" signal is due to drop
    pub fn decay_deadline(&self) -> Option<Instant> {
        self.decay.deadline()
    }

    /// Number of times the "just arrived" signal went up
    pub fn pulses(&self) -> u64 {
        self.pulses
    }

    /// The clock this core runs on
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Read-only copy of the derived state
    pub fn view(&self) -> PulseView {
        PulseView {
            latest: self.latest.clone(),
            status: self.status,
            just_arrived: self.just_arrived(),
        }
    }
}

fn window_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ManualClock;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_564_800 + secs, 0).unwrap()
    }

    fn event(id: i64, secs: i64) -> EventRecord {
        EventRecord::new(id, Some("backend-architect-sabine"), format!("event {id}"), at(secs))
    }

    fn core() -> (EventSyncCore, ManualClock) {
        let clock = ManualClock::new();
        let core = EventSyncCore::with_clock(DEFAULT_DECAY_WINDOW, Arc::new(clock.clone()));
        (core, clock)
    }

    #[test]
    fn test_initial_state() {
        let (core, _) = core();
        assert_eq!(core.latest_event(), None);
        assert_eq!(core.connection_status(), ConnectionStatus::Connecting);
        assert!(!core.just_arrived());
        assert_eq!(core.decay_deadline(), None);
    }

    #[test]
    fn test_seed_adopts_when_empty_without_pulse() {
        let (mut core, _) = core();
        assert!(core.seed(Some(event(1, 0))));
        assert_eq!(core.latest_event(), Some(&event(1, 0)));
        assert!(!core.just_arrived());
        assert_eq!(core.pulses(), 0);
    }

    #[test]
    fn test_empty_seed_is_a_no_op() {
        let (mut core, _) = core();
        assert!(!core.seed(None));
        assert_eq!(core.latest_event(), None);
    }

    #[test]
    fn test_late_seed_does_not_overwrite_newer_stream_event() {
        let (mut core, _) = core();
        assert!(core.observe_inserted(event(2, 10)));
        assert!(!core.seed(Some(event(1, 5))));
        assert_eq!(core.latest_event(), Some(&event(2, 10)));
    }

    #[test]
    fn test_late_seed_wins_when_newer() {
        let (mut core, _) = core();
        core.observe_inserted(event(1, 5));
        assert!(core.seed(Some(event(2, 10))));
        assert_eq!(core.latest_event(), Some(&event(2, 10)));
    }

    #[test]
    fn test_older_insert_never_regresses() {
        let (mut core, _) = core();
        core.observe_inserted(event(5, 100));
        assert!(!core.observe_inserted(event(6, 99)));
        assert!(!core.observe_inserted(event(4, 100)));
        assert_eq!(core.latest_event(), Some(&event(5, 100)));
    }

    #[test]
    fn test_duplicate_insert_is_a_no_op() {
        let (mut core, clock) = core();
        core.observe_inserted(event(1, 0));
        let deadline = core.decay_deadline();

        clock.advance(Duration::from_millis(500));
        assert!(!core.observe_inserted(event(1, 0)));

        assert_eq!(core.decay_deadline(), deadline);
        assert_eq!(core.pulses(), 1);
    }

    #[test]
    fn test_decay_bound() {
        let (mut core, clock) = core();
        core.observe_inserted(event(1, 0));
        assert!(core.just_arrived());

        clock.advance(Duration::from_millis(1999));
        assert!(core.just_arrived());
        assert!(!core.poll_decay());

        clock.advance(Duration::from_millis(1));
        assert!(!core.just_arrived());
        assert!(core.poll_decay());
        assert_eq!(core.decay_deadline(), None);
        assert!(!core.poll_decay());
    }

    #[test]
    fn test_rapid_inserts_keep_signal_up() {
        let (mut core, clock) = core();
        core.observe_inserted(event(1, 0));
        clock.advance(Duration::from_millis(1500));
        core.observe_inserted(event(2, 1));
        clock.advance(Duration::from_millis(1500));

        assert!(core.just_arrived());
        assert_eq!(core.pulses(), 1);

        clock.advance(Duration::from_millis(500));
        assert!(!core.just_arrived());
    }

    #[test]
    fn test_new_pulse_after_decay() {
        let (mut core, clock) = core();
        core.observe_inserted(event(1, 0));
        clock.advance(Duration::from_secs(3));
        core.poll_decay();
        core.observe_inserted(event(2, 3));

        assert!(core.just_arrived());
        assert_eq!(core.pulses(), 2);
    }

    #[test]
    fn test_status_stored_verbatim() {
        let (mut core, _) = core();
        core.observe_connection_status(ConnectionStatus::Subscribed);
        assert_eq!(core.connection_status(), ConnectionStatus::Subscribed);
        core.observe_connection_status(ConnectionStatus::Disconnected);
        assert_eq!(core.connection_status(), ConnectionStatus::Disconnected);
        core.observe_connection_status(ConnectionStatus::Connecting);
        assert_eq!(core.connection_status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_teardown_cancels_timer() {
        let (mut core, _) = core();
        core.observe_inserted(event(1, 0));
        core.teardown();

        assert_eq!(core.decay_deadline(), None);
        assert!(!core.just_arrived());
        assert_eq!(core.latest_event(), Some(&event(1, 0)));
    }

    #[test]
    fn test_view_mirrors_state() {
        let (mut core, _) = core();
        core.observe_connection_status(ConnectionStatus::Subscribed);
        core.observe_inserted(event(1, 0));

        assert_eq!(
            core.view(),
            PulseView {
                latest: Some(event(1, 0)),
                status: ConnectionStatus::Subscribed,
                just_arrived: true,
            }
        );
    }

    #[test]
    fn test_window_millis_saturates() {
        assert_eq!(window_millis(DEFAULT_DECAY_WINDOW), 2_000);
        assert_eq!(window_millis(Duration::MAX), u64::MAX);
    }
}
