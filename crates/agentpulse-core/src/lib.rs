//! # AgentPulse
//!
//! Live activity pulse for multi-agent systems.
//!
//! AgentPulse keeps a single "latest event" in sync with an append-only
//! event store: it seeds from a one-shot snapshot, follows realtime insert
//! notifications, and raises a short-lived "just arrived" signal whenever a
//! newer event shows up.
//!
//! ## Architecture
//!
//! - **Sync**: the event sync core, decay timer and the session driving them
//! - **Channel**: realtime subscription seam plus an in-memory store
//! - **Storage**: PostgreSQL for the event table, Redis pub/sub for inserts
//! - **TUI**: terminal dashboard rendering the pulse
//!
//! ## Quick Start
//!
//! ```bash
//! # Watch the pulse against a synthetic feed
//! agentpulse dashboard --demo
//!
//! # Stream pulses from the real store as JSON lines
//! agentpulse watch --format json
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod channel;
pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod format;
pub mod models;
pub mod sync;
pub mod tui;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::channel::{MemoryStore, RealtimeChannel};
    pub use crate::config::Config;
    pub use crate::db::Database;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::sync::{EventSource, EventSyncCore, PulseSession, PulseView};
}
