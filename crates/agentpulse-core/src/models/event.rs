//! Agent event data model

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier assigned to an event by the backing store.
///
/// Stores hand out either sequence numbers or opaque keys. Numeric ids
/// order numerically and sort before textual ones, so every pair of ids
/// compares deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum EventId {
    /// Store-assigned sequence number
    Seq(i64),
    /// Opaque textual key (uuid, ulid, ...)
    Key(String),
}

impl EventId {
    /// Parse an id from its textual form, preferring the numeric variant
    pub fn parse(raw: &str) -> Self {
        raw.trim()
            .parse::<i64>()
            .map_or_else(|_| Self::Key(raw.to_string()), Self::Seq)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seq(n) => write!(f, "{n}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

impl From<i64> for EventId {
    fn from(value: i64) -> Self {
        Self::Seq(value)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Seq(i64),
            Key(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Seq(n) => Self::Seq(n),
            RawId::Key(k) => Self::parse(&k),
        })
    }
}

/// One agent activity entry, as created by the backing store.
///
/// Records are immutable once created; the pulse core only observes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier
    pub id: EventId,

    /// Agent that produced the event (`None` means the system itself)
    #[serde(default)]
    pub role: Option<String>,

    /// Free-text payload
    #[serde(default)]
    pub content: String,

    /// Creation time, assigned by the store
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Create a record
    pub fn new(
        id: impl Into<EventId>,
        role: Option<&str>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            role: role.map(str::to_string),
            content: content.into(),
            created_at,
        }
    }

    /// Total ordering key: creation time, then id
    pub fn order_key(&self) -> (DateTime<Utc>, &EventId) {
        (self.created_at, &self.id)
    }

    /// Compare two records by their ordering key
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }

    /// Whether this record strictly supersedes `current`
    pub fn is_newer_than(&self, current: Option<&Self>) -> bool {
        current.map_or(true, |cur| self.cmp_order(cur) == Ordering::Greater)
    }

    /// Role with empty strings treated as absent
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().filter(|r| !r.is_empty())
    }
}

/// Input for creating a new event in a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    /// Agent role identifier, `None` for system events
    pub role: Option<String>,
    /// Free-form message
    pub content: String,
}

impl NewEvent {
    /// Create an event input
    pub fn new(role: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            content: content.into(),
        }
    }
}
