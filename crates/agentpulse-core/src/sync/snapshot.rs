//! One-shot startup snapshot

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::EventRecord;

/// Read side of a backing store
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the record with the greatest `created_at`, if any
    async fn fetch_latest(&self) -> Result<Option<EventRecord>>;
}

/// Issues the single startup read for the latest event.
///
/// A failed read is not retried; the pulse starts from an empty seed and the
/// realtime stream fills it in.
#[derive(Clone)]
pub struct SnapshotLoader {
    source: Arc<dyn EventSource>,
}

impl SnapshotLoader {
    /// Create a loader over `source`
    pub fn new(source: Arc<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Read the latest event, treating any failure as "no snapshot"
    pub async fn load(&self) -> Option<EventRecord> {
        match self.source.fetch_latest().await {
            Ok(Some(record)) => {
                debug!(event_id = %record.id, "Loaded latest event snapshot");
                Some(record)
            }
            Ok(None) => {
                debug!("Store is empty, no snapshot");
                None
            }
            Err(e) => {
                warn!(error = %e, "Snapshot unavailable, starting from an empty seed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::Utc;

    struct FailingSource;

    #[async_trait::async_trait]
    impl EventSource for FailingSource {
        async fn fetch_latest(&self) -> Result<Option<EventRecord>> {
            Err(Error::snapshot("connection refused"))
        }
    }

    struct FixedSource(Option<EventRecord>);

    #[async_trait::async_trait]
    impl EventSource for FixedSource {
        async fn fetch_latest(&self) -> Result<Option<EventRecord>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_failure_yields_none() {
        let loader = SnapshotLoader::new(Arc::new(FailingSource));
        assert_eq!(loader.load().await, None);
    }

    #[tokio::test]
    async fn test_empty_store_yields_none() {
        let loader = SnapshotLoader::new(Arc::new(FixedSource(None)));
        assert_eq!(loader.load().await, None);
    }

    #[tokio::test]
    async fn test_returns_record() {
        let record = EventRecord::new(3, None, "boot", Utc::now());
        let loader = SnapshotLoader::new(Arc::new(FixedSource(Some(record.clone()))));
        assert_eq!(loader.load().await, Some(record));
    }
}
