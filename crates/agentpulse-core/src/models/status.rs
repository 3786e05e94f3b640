//! Connection status model

use serde::{Deserialize, Serialize};

/// Health of the realtime subscription as seen by consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Waiting for the transport to confirm the subscription
    #[default]
    Connecting,
    /// Subscription confirmed, inserts are flowing
    Subscribed,
    /// Subscription lost; the transport may be reconnecting
    Disconnected,
}

impl ConnectionStatus {
    /// Whether inserts are currently being delivered
    pub fn is_live(self) -> bool {
        self == Self::Subscribed
    }

    /// Short badge label
    pub fn label(self) -> &'static str {
        match self {
            Self::Subscribed => "LIVE",
            Self::Connecting | Self::Disconnected => "OFFLINE",
        }
    }
}

/// Out-of-band status signal reported by a realtime transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// The transport confirmed the subscription
    Subscribed,
    /// The transport reported an error
    Error(String),
    /// The transport gave up waiting for a confirmation
    TimedOut,
    /// The subscription was closed
    Closed,
}

impl From<&ChannelStatus> for ConnectionStatus {
    fn from(status: &ChannelStatus) -> Self {
        match status {
            ChannelStatus::Subscribed => Self::Subscribed,
            ChannelStatus::Error(_) | ChannelStatus::TimedOut | ChannelStatus::Closed => {
                Self::Disconnected
            }
        }
    }
}
