//! Redis connection and pub/sub streaming

use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::{Config as PoolConfig, Pool, PoolConfig as PoolSizing, Runtime};
use futures::StreamExt;
use redis::AsyncCommands;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{Dispatch, InsertHandler, RealtimeChannel, StatusHandler};
use crate::config::RedisConfig;
use crate::error::{Error, Result};
use crate::models::{ChannelStatus, EventRecord};

/// Redis connection pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl RedisPool {
    /// Create a new Redis connection pool
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let mut cfg = PoolConfig::from_url(&config.url);
        cfg.pool = Some(PoolSizing::new(config.max_connections as usize));
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;

        Ok(Self { pool })
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Publishes created events for realtime subscribers
#[derive(Clone)]
pub struct RedisStreamer {
    pool: Pool,
    channel: String,
}

impl RedisStreamer {
    /// Create a new Redis streamer
    pub fn new(pool: &RedisPool, channel: impl Into<String>) -> Self {
        Self {
            pool: pool.pool.clone(),
            channel: channel.into(),
        }
    }

    /// Publish a created event. Returns the number of receiving subscribers.
    pub async fn publish_event(&self, event: &EventRecord) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let payload = serde_json::to_string(event)?;

        let receivers: usize = conn.publish(&self.channel, &payload).await?;
        debug!(event_id = %event.id, receivers, "Published event");
        Ok(receivers)
    }
}

/// Insert notification as published on the wire.
///
/// Accepts a bare record or a change envelope carrying it under `new`.
#[derive(Deserialize)]
#[serde(untagged)]
enum InsertPayload {
    Envelope { new: EventRecord },
    Record(EventRecord),
}

/// Decode an insert notification payload
pub fn decode_event(payload: &str) -> Result<EventRecord> {
    match serde_json::from_str::<InsertPayload>(payload) {
        Ok(InsertPayload::Envelope { new }) => Ok(new),
        Ok(InsertPayload::Record(record)) => Ok(record),
        Err(e) => Err(Error::malformed(e.to_string())),
    }
}

/// Realtime channel backed by Redis pub/sub.
///
/// A background task owns the pub/sub connection and reconnects after a
/// fixed delay whenever it drops.
pub struct RedisChannel {
    client: redis::Client,
    channel: String,
    reconnect_delay: Duration,
    dispatch: Arc<Dispatch>,
    task: Option<JoinHandle<()>>,
}

impl RedisChannel {
    /// Create an unsubscribed channel
    pub fn new(config: &RedisConfig) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(config.url.as_str())?,
            channel: config.channel.clone(),
            reconnect_delay: config.reconnect_delay,
            dispatch: Dispatch::new(),
            task: None,
        })
    }
}

impl RealtimeChannel for RedisChannel {
    fn on_insert(&mut self, handler: InsertHandler) {
        self.dispatch.set_insert_handler(handler);
    }

    fn on_status(&mut self, handler: StatusHandler) {
        self.dispatch.set_status_handler(handler);
    }

    fn subscribe(&mut self) -> Result<()> {
        if self.dispatch.is_closed() {
            return Err(Error::channel("redis channel already closed"));
        }
        if self.task.is_some() {
            return Ok(());
        }

        let client = self.client.clone();
        let channel = self.channel.clone();
        let delay = self.reconnect_delay;
        let dispatch = self.dispatch.clone();

        self.task = Some(tokio::spawn(async move {
            loop {
                match listen(&client, &channel, &dispatch).await {
                    Ok(()) => dispatch.status(ChannelStatus::Closed),
                    Err(e) => {
                        warn!(error = %e, channel = %channel, "Redis subscription failed");
                        dispatch.status(ChannelStatus::Error(e.to_string()));
                    }
                }

                if dispatch.is_closed() {
                    break;
                }
                tokio::time::sleep(delay).await;
                debug!(channel = %channel, "Reconnecting to Redis");
            }
        }));

        Ok(())
    }

    fn close(&mut self) {
        if self.dispatch.close() {
            debug!(channel = %self.channel, "Redis channel closed");
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_closed(&self) -> bool {
        self.dispatch.is_closed()
    }
}

impl Drop for RedisChannel {
    fn drop(&mut self) {
        self.close();
    }
}

async fn listen(client: &redis::Client, channel: &str, dispatch: &Dispatch) -> Result<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;

    info!(channel, "Subscribed to Redis event channel");
    dispatch.status(ChannelStatus::Subscribed);

    let mut messages = pubsub.on_message();
    while let Some(message) = messages.next().await {
        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Unreadable pub/sub payload");
                continue;
            }
        };

        match decode_event(&payload) {
            Ok(record) => {
                dispatch.insert(record);
            }
            Err(e) => warn!(error = %e, "Dropping malformed event"),
        }
    }

    Ok(())
}
