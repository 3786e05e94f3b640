//! Synthetic event feed for `--demo` mode
//!
//! Writes into a [`MemoryStore`] so the dashboard and `watch` can run
//! without PostgreSQL or Redis.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::channel::MemoryStore;
use crate::models::{ChannelStatus, NewEvent};

const ROLES: &[Option<&str>] = &[
    Some("SABINE_ARCHITECT"),
    Some("backend-architect-sabine"),
    Some("frontend-ops-sabine"),
    Some("data-ai-engineer-sabine"),
    Some("product-manager-sabine"),
    Some("qa-security-sabine"),
    Some("release-bot"),
    None,
];

const MESSAGES: &[&str] = &[
    "Scan complete",
    "Drafted the migration plan for the events table and opened a review",
    "Deploy finished on staging",
    "Retraining embeddings on the latest support tickets",
    "Updated the roadmap with next sprint priorities",
    "Found 2 medium-severity findings in the auth flow, filing tickets now",
    "Heartbeat",
    "Rebuilt the dashboard bundle, size down 12%",
    "Reviewing pull request #482: connection pool tuning",
    "Sync finished",
];

/// Chance per tick of a simulated transport outage
const OUTAGE_CHANCE: f64 = 0.05;

/// Spawn a task that keeps inserting random events into `store`.
///
/// Seeds one historical event first so the snapshot has something to load.
pub fn spawn_demo_feed(store: MemoryStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();

        store.insert_at(
            NewEvent::new(Some("SABINE_ARCHITECT"), "Planning session kicked off"),
            Utc::now() - chrono::Duration::minutes(7),
        );
        info!("Demo feed started");

        loop {
            let pause = Duration::from_millis(rng.gen_range(1_500..=4_000));
            tokio::time::sleep(pause).await;

            if rng.gen_bool(OUTAGE_CHANCE) {
                debug!("Demo feed simulating outage");
                store.signal_status(ChannelStatus::Error("simulated outage".to_string()));
                tokio::time::sleep(Duration::from_secs(3)).await;
                store.signal_status(ChannelStatus::Subscribed);
                continue;
            }

            let role = ROLES.choose(&mut rng).copied().flatten();
            let content = MESSAGES.choose(&mut rng).copied().unwrap_or("Heartbeat");
            let record = store.insert(NewEvent::new(role, content));
            debug!(event_id = %record.id, "Demo event inserted");
        }
    })
}
