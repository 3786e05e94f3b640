//! Backing store adapters
//!
//! PostgreSQL holds the `agent_events` table; Redis pub/sub carries insert
//! notifications to realtime subscribers.

mod postgres;
mod redis;

pub use postgres::{EventRepository, PostgresPool};
pub use redis::{decode_event, RedisChannel, RedisPool, RedisStreamer};

use crate::config::Config;
use crate::error::Result;
use crate::models::{EventRecord, NewEvent};

/// Database connections bundle
#[derive(Clone)]
pub struct Database {
    /// PostgreSQL connection pool
    pub postgres: PostgresPool,
    /// Redis connection pool
    pub redis: RedisPool,
    channel: String,
}

impl Database {
    /// Create a new database connection bundle
    pub async fn new(config: &Config) -> Result<Self> {
        let postgres = PostgresPool::new(&config.database).await?;
        let redis = RedisPool::new(&config.redis)?;

        Ok(Self {
            postgres,
            redis,
            channel: config.redis.channel.clone(),
        })
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        self.postgres.health_check().await?;
        self.redis.health_check().await?;
        Ok(())
    }

    /// Event repository over the PostgreSQL pool
    pub fn events(&self) -> EventRepository {
        EventRepository::new(&self.postgres)
    }

    /// Create an event and notify realtime subscribers.
    ///
    /// The row is the source of truth; a failed publish is reported but the
    /// event still exists and will show up in the next snapshot.
    pub async fn create_event(&self, event: &NewEvent) -> Result<(EventRecord, Result<usize>)> {
        let record = self.events().insert(event).await?;
        let published = RedisStreamer::new(&self.redis, self.channel.clone())
            .publish_event(&record)
            .await;
        Ok((record, published))
    }
}
