//! In-process event store and channel
//!
//! Stands in for the database and realtime transport in tests and demo mode.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{ChannelStatus, EventId, EventRecord, NewEvent};
use crate::sync::EventSource;

use super::{Dispatch, InsertHandler, RealtimeChannel, StatusHandler};

const FEED_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum StoreSignal {
    Inserted(EventRecord),
    Status(ChannelStatus),
}

struct StoreState {
    records: Vec<EventRecord>,
    next_id: i64,
    last_created: Option<DateTime<Utc>>,
    fail_reads: bool,
}

/// Event store held in memory.
///
/// Ids are assigned sequentially and `created_at` never goes backwards.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    feed: broadcast::Sender<StoreSignal>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(StoreState {
                records: Vec::new(),
                next_id: 1,
                last_created: None,
                fail_reads: false,
            })),
            feed,
        }
    }

    /// Create a record stamped with the current time
    pub fn insert(&self, event: NewEvent) -> EventRecord {
        self.create(event, None)
    }

    /// Create a record with an explicit creation time (backfill, tests)
    pub fn insert_at(&self, event: NewEvent, created_at: DateTime<Utc>) -> EventRecord {
        self.create(event, Some(created_at))
    }

    fn create(&self, event: NewEvent, created_at: Option<DateTime<Utc>>) -> EventRecord {
        let record = {
            let mut state = self.state.lock();

            let created_at = created_at.unwrap_or_else(|| {
                let now = Utc::now();
                match state.last_created {
                    Some(last) if now <= last => last + Duration::microseconds(1),
                    _ => now,
                }
            });
            state.last_created = Some(state.last_created.map_or(created_at, |l| l.max(created_at)));

            let record = EventRecord {
                id: EventId::Seq(state.next_id),
                role: event.role,
                content: event.content,
                created_at,
            };
            state.next_id += 1;
            state.records.push(record.clone());
            record
        };

        debug!(event_id = %record.id, "Stored event");
        // No subscribers is fine
        let _ = self.feed.send(StoreSignal::Inserted(record.clone()));
        record
    }

    /// Report a transport status to every open channel
    pub fn signal_status(&self, status: ChannelStatus) {
        let _ = self.feed.send(StoreSignal::Status(status));
    }

    /// Make subsequent snapshot reads fail
    pub fn set_read_failure(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Newest records first
    pub fn recent(&self, limit: usize) -> Vec<EventRecord> {
        let mut records = self.state.lock().records.clone();
        records.sort_by(|a, b| b.cmp_order(a));
        records.truncate(limit);
        records
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Open a realtime channel on this store
    pub fn channel(&self) -> MemoryChannel {
        MemoryChannel::new(self.clone())
    }
}

#[async_trait::async_trait]
impl EventSource for MemoryStore {
    async fn fetch_latest(&self) -> Result<Option<EventRecord>> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(Error::snapshot("memory store read failure"));
        }
        Ok(state.records.iter().max_by(|a, b| a.cmp_order(b)).cloned())
    }
}

/// Realtime channel over a [`MemoryStore`]
pub struct MemoryChannel {
    store: MemoryStore,
    dispatch: Arc<Dispatch>,
    task: Option<JoinHandle<()>>,
}

impl MemoryChannel {
    /// Create an unsubscribed channel
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            dispatch: Dispatch::new(),
            task: None,
        }
    }
}

impl RealtimeChannel for MemoryChannel {
    fn on_insert(&mut self, handler: InsertHandler) {
        self.dispatch.set_insert_handler(handler);
    }

    fn on_status(&mut self, handler: StatusHandler) {
        self.dispatch.set_status_handler(handler);
    }

    fn subscribe(&mut self) -> Result<()> {
        if self.dispatch.is_closed() {
            return Err(Error::channel("memory channel already closed"));
        }
        if self.task.is_some() {
            return Ok(());
        }

        // Subscribe before spawning so nothing inserted from here on is missed
        let mut feed = self.store.feed.subscribe();
        let dispatch = self.dispatch.clone();

        self.task = Some(tokio::spawn(async move {
            dispatch.status(ChannelStatus::Subscribed);

            loop {
                match feed.recv().await {
                    Ok(StoreSignal::Inserted(record)) => {
                        dispatch.insert(record);
                    }
                    Ok(StoreSignal::Status(status)) => dispatch.status(status),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Memory channel lagged, events dropped");
                    }
                    Err(RecvError::Closed) => {
                        dispatch.status(ChannelStatus::Closed);
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    fn close(&mut self) {
        if self.dispatch.close() {
            debug!("Memory channel closed");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_closed(&self) -> bool {
        self.dispatch.is_closed()
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.close();
    }
}
