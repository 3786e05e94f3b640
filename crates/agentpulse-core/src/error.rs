//! Error types for AgentPulse

use thiserror::Error;

/// Result type alias using AgentPulse's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for AgentPulse operations
///
/// The pulse core itself never hands these to consumers. Backing store
/// adapters return them, and the core logs and recovers.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error
    #[error("Redis pool error: {0}")]
    Pool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// The one-shot snapshot read failed
    #[error("Snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// The realtime subscription was lost or could not be established
    #[error("Channel disconnected: {0}")]
    ChannelDisconnected(String),

    /// A record payload could not be decoded
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Terminal UI error
    #[error("Terminal UI error: {0}")]
    Tui(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a snapshot error
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::SnapshotUnavailable(msg.into())
    }

    /// Create a channel error
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelDisconnected(msg.into())
    }

    /// Create a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Create a TUI error
    pub fn tui(msg: impl Into<String>) -> Self {
        Self::Tui(msg.into())
    }
}

impl From<deadpool_redis::PoolError> for Error {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<deadpool_redis::CreatePoolError> for Error {
    fn from(err: deadpool_redis::CreatePoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
