//! Pulse session: the owning view of one sync core
//!
//! Wires the snapshot loader and a realtime channel into an [`EventSyncCore`]
//! and drives it from a single task. Channel callbacks and the snapshot read
//! only enqueue messages; all state changes happen in [`PulseSession::step`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::channel::{RealtimeChannel, SubscriptionGuard};
use crate::config::PulseConfig;
use crate::error::Result;
use crate::models::{ChannelStatus, ConnectionStatus, EventRecord};

use super::engine::EventSyncCore;
use super::snapshot::{EventSource, SnapshotLoader};
use super::view::PulseView;

/// Input to the sync core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PulseMessage {
    /// The startup snapshot resolved
    Snapshot(Option<EventRecord>),
    /// The channel delivered a newly created record
    Inserted(EventRecord),
    /// The channel reported a status change
    Status(ChannelStatus),
}

/// Running pulse: core, subscription and snapshot read.
///
/// Dropping the session cancels the decay timer, closes the subscription
/// and abandons an unfinished snapshot read.
pub struct PulseSession {
    core: EventSyncCore,
    rx: mpsc::UnboundedReceiver<PulseMessage>,
    subscription: SubscriptionGuard,
    snapshot_task: Option<JoinHandle<()>>,
    view_tx: watch::Sender<PulseView>,
}

impl PulseSession {
    /// Register channel handlers, subscribe, and start the snapshot read.
    ///
    /// Must be called inside a tokio runtime. Subscription and snapshot run
    /// concurrently and may resolve in either order.
    pub fn start(
        source: Arc<dyn EventSource>,
        mut channel: Box<dyn RealtimeChannel>,
        config: &PulseConfig,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let insert_tx = tx.clone();
        channel.on_insert(Box::new(move |record| {
            let _ = insert_tx.send(PulseMessage::Inserted(record));
        }));
        let status_tx = tx.clone();
        channel.on_status(Box::new(move |status| {
            let _ = status_tx.send(PulseMessage::Status(status));
        }));

        let mut subscription = SubscriptionGuard::new(channel);
        subscription.subscribe()?;

        let loader = SnapshotLoader::new(source);
        let snapshot_task = tokio::spawn(async move {
            let seed = loader.load().await;
            let _ = tx.send(PulseMessage::Snapshot(seed));
        });

        let core = EventSyncCore::new(config.decay_window);
        let (view_tx, _) = watch::channel(core.view());

        info!(decay_window = ?config.decay_window, "Pulse session started");

        Ok(Self {
            core,
            rx,
            subscription,
            snapshot_task: Some(snapshot_task),
            view_tx,
        })
    }

    /// Receiver for view updates. Consumers only ever read.
    pub fn subscribe_view(&self) -> watch::Receiver<PulseView> {
        self.view_tx.subscribe()
    }

    /// The sync core
    pub fn core(&self) -> &EventSyncCore {
        &self.core
    }

    /// Current derived state
    pub fn view(&self) -> PulseView {
        self.core.view()
    }

    /// Apply one message to the core and publish the result
    pub fn apply(&mut self, message: PulseMessage) {
        match message {
            PulseMessage::Snapshot(seed) => {
                self.core.seed(seed);
                self.snapshot_task = None;
            }
            PulseMessage::Inserted(record) => {
                self.core.observe_inserted(record);
            }
            PulseMessage::Status(status) => {
                self.core
                    .observe_connection_status(ConnectionStatus::from(&status));
            }
        }
        self.publish();
    }

    /// Wait for the next message or the decay deadline and handle it.
    ///
    /// Returns `false` once no more messages can arrive.
    pub async fn step(&mut self) -> bool {
        let deadline = self.core.decay_deadline();

        tokio::select! {
            message = self.rx.recv() => match message {
                Some(message) => {
                    self.apply(message);
                    true
                }
                None => false,
            },
            () = sleep_until(deadline) => {
                self.core.poll_decay();
                self.publish();
                true
            }
        }
    }

    /// Drive the session until `shutdown` resolves, then tear down
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    debug!("Pulse session shutdown requested");
                    break;
                }
                alive = self.step() => {
                    if !alive {
                        debug!("Pulse inputs closed");
                        break;
                    }
                }
            }
        }
    }

    /// Tear the session down now. Idempotent; also runs on drop.
    pub fn shutdown(&mut self) {
        self.core.teardown();
        self.subscription.close();
        if let Some(task) = self.snapshot_task.take() {
            task.abort();
        }
        self.publish();
    }

    /// Whether the subscription has been released
    pub fn is_closed(&self) -> bool {
        self.subscription.is_closed()
    }

    fn publish(&self) {
        let next = self.core.view();
        self.view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl Drop for PulseSession {
    fn drop(&mut self) {
        self.shutdown();
        info!("Pulse session closed");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
