//! Realtime channels
//!
//! A channel delivers "record created" notifications from a backing store
//! and reports the health of the subscription. Transports (Redis pub/sub,
//! the in-memory store) share [`Dispatch`], which owns the registered
//! handlers and the subscription state machine.

mod memory;

pub use memory::{MemoryChannel, MemoryStore};

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::models::{ChannelStatus, ConnectionStatus, EventRecord};

/// Callback receiving newly created records
pub type InsertHandler = Box<dyn Fn(EventRecord) + Send + Sync>;

/// Callback receiving subscription status reports
pub type StatusHandler = Box<dyn Fn(ChannelStatus) + Send + Sync>;

/// Subscription to a store's insert notifications
pub trait RealtimeChannel: Send {
    /// Register the handler for inserted records
    fn on_insert(&mut self, handler: InsertHandler);

    /// Register the handler for status reports
    fn on_status(&mut self, handler: StatusHandler);

    /// Start delivering. Handlers should be registered first.
    fn subscribe(&mut self) -> Result<()>;

    /// Cancel the subscription. No handler runs after this returns.
    /// Safe to call more than once.
    fn close(&mut self);

    /// Whether [`RealtimeChannel::close`] has been called
    fn is_closed(&self) -> bool;
}

struct DispatchState {
    insert: Option<InsertHandler>,
    status: Option<StatusHandler>,
    connection: ConnectionStatus,
    closed: bool,
}

/// Handler registry and subscription state shared with a transport task.
///
/// States move `Connecting -> Subscribed -> Disconnected -> Subscribed ...`
/// as the transport reports. Inserts are forwarded only while subscribed.
/// Handlers run under the dispatch lock, so they must not call back into
/// the channel; in exchange, `close` guarantees no handler runs afterwards.
pub struct Dispatch {
    state: Mutex<DispatchState>,
}

impl Dispatch {
    /// Create a dispatch in the `Connecting` state
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(DispatchState {
                insert: None,
                status: None,
                connection: ConnectionStatus::Connecting,
                closed: false,
            }),
        })
    }

    /// Register the insert handler
    pub fn set_insert_handler(&self, handler: InsertHandler) {
        let mut state = self.state.lock();
        if !state.closed {
            state.insert = Some(handler);
        }
    }

    /// Register the status handler
    pub fn set_status_handler(&self, handler: StatusHandler) {
        let mut state = self.state.lock();
        if !state.closed {
            state.status = Some(handler);
        }
    }

    /// Apply a status report from the transport and forward it
    pub fn status(&self, status: ChannelStatus) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }

        let next = ConnectionStatus::from(&status);
        if state.connection != next {
            debug!(from = ?state.connection, to = ?next, report = ?status, "Channel state changed");
        }
        state.connection = next;

        if let Some(handler) = &state.status {
            handler(status);
        }
    }

    /// Forward an inserted record. Returns whether a handler received it.
    pub fn insert(&self, record: EventRecord) -> bool {
        let state = self.state.lock();
        if state.closed || !state.connection.is_live() {
            trace!(event_id = %record.id, connection = ?state.connection, "Dropping insert outside subscription");
            return false;
        }

        match &state.insert {
            Some(handler) => {
                handler(record);
                true
            }
            None => false,
        }
    }

    /// Close the dispatch and drop its handlers. Returns `true` on the first call.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        state.insert = None;
        state.status = None;
        true
    }

    /// Whether the dispatch is closed
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Current subscription state
    pub fn connection(&self) -> ConnectionStatus {
        self.state.lock().connection
    }
}

/// Owns a channel and closes it when dropped, on every exit path.
pub struct SubscriptionGuard {
    channel: Box<dyn RealtimeChannel>,
}

impl SubscriptionGuard {
    /// Take ownership of `channel`
    pub fn new(channel: Box<dyn RealtimeChannel>) -> Self {
        Self { channel }
    }

    /// Start the subscription
    pub fn subscribe(&mut self) -> Result<()> {
        self.channel.subscribe()
    }

    /// Close the subscription now
    pub fn close(&mut self) {
        self.channel.close();
    }

    /// Whether the subscription is closed
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.channel.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_dispatch() -> (Arc<Dispatch>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let dispatch = Dispatch::new();
        let inserts = Arc::new(AtomicUsize::new(0));
        let statuses = Arc::new(AtomicUsize::new(0));

        let counter = inserts.clone();
        dispatch.set_insert_handler(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = statuses.clone();
        dispatch.set_status_handler(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        (dispatch, inserts, statuses)
    }

    fn record(id: i64) -> EventRecord {
        EventRecord::new(id, None, "x", Utc::now())
    }

    #[test]
    fn test_inserts_gated_on_subscription() {
        let (dispatch, inserts, _) = counting_dispatch();
        assert_eq!(dispatch.connection(), ConnectionStatus::Connecting);
        assert!(!dispatch.insert(record(1)));

        dispatch.status(ChannelStatus::Subscribed);
        assert!(dispatch.insert(record(2)));

        dispatch.status(ChannelStatus::Error("network down".to_string()));
        assert_eq!(dispatch.connection(), ConnectionStatus::Disconnected);
        assert!(!dispatch.insert(record(3)));

        dispatch.status(ChannelStatus::Subscribed);
        assert!(dispatch.insert(record(4)));

        assert_eq!(inserts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_every_status_report_is_forwarded() {
        let (dispatch, _, statuses) = counting_dispatch();
        dispatch.status(ChannelStatus::Subscribed);
        dispatch.status(ChannelStatus::Subscribed);
        dispatch.status(ChannelStatus::TimedOut);
        assert_eq!(statuses.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_no_callbacks_after_close() {
        let (dispatch, inserts, statuses) = counting_dispatch();
        dispatch.status(ChannelStatus::Subscribed);

        assert!(dispatch.close());
        assert!(!dispatch.close());

        dispatch.status(ChannelStatus::Closed);
        assert!(!dispatch.insert(record(1)));
        assert_eq!(inserts.load(Ordering::SeqCst), 0);
        assert_eq!(statuses.load(Ordering::SeqCst), 1);
        assert!(dispatch.is_closed());
    }
}
