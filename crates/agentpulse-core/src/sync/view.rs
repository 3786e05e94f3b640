//! Read-only pulse state handed to consumer views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format::{format_relative_time, truncate, RoleDirectory, RoleTone};
use crate::models::{ConnectionStatus, EventRecord};

/// Snapshot of the sync core's derived state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PulseView {
    /// Newest event observed so far
    pub latest: Option<EventRecord>,
    /// Realtime subscription health
    pub status: ConnectionStatus,
    /// Whether the latest event arrived within the decay window
    pub just_arrived: bool,
}

impl PulseView {
    /// Label for the latest event's role
    pub fn role_label(&self, roles: &RoleDirectory) -> Option<String> {
        self.latest.as_ref().map(|e| roles.display(e.role()))
    }

    /// Badge tone for the latest event's role
    pub fn role_tone(&self, roles: &RoleDirectory) -> RoleTone {
        self.latest
            .as_ref()
            .map_or(RoleTone::Neutral, |e| roles.tone(e.role()))
    }

    /// Truncated content of the latest event
    pub fn snippet(&self, max_len: usize) -> Option<String> {
        self.latest.as_ref().map(|e| truncate(&e.content, max_len))
    }

    /// Age of the latest event relative to `now`
    pub fn time_ago(&self, now: DateTime<Utc>) -> Option<String> {
        self.latest
            .as_ref()
            .map(|e| format_relative_time(e.created_at, now))
    }
}
