//! Property tests for ordering and formatting

use std::sync::Arc;

use agentpulse::format::{truncate, ELLIPSIS};
use agentpulse::models::EventRecord;
use agentpulse::sync::{EventSyncCore, ManualClock, DEFAULT_DECAY_WINDOW};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Seed(EventRecord),
    Insert(EventRecord),
}

fn record() -> impl Strategy<Value = EventRecord> {
    // Small ranges so ties on created_at are common
    (0i64..20, 0i64..10).prop_map(|(secs, id)| {
        EventRecord::new(
            id,
            None,
            format!("event {id}"),
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        )
    })
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => record().prop_map(Step::Seed),
        4 => record().prop_map(Step::Insert),
    ]
}

fn core() -> EventSyncCore {
    EventSyncCore::with_clock(DEFAULT_DECAY_WINDOW, Arc::new(ManualClock::new()))
}

fn apply(core: &mut EventSyncCore, steps: &[Step]) {
    for step in steps {
        match step.clone() {
            Step::Seed(record) => {
                core.seed(Some(record));
            }
            Step::Insert(record) => {
                core.observe_inserted(record);
            }
        }
    }
}

proptest! {
    #[test]
    fn latest_is_the_maximum_of_everything_observed(steps in prop::collection::vec(step(), 0..40)) {
        let mut core = core();
        apply(&mut core, &steps);

        let expected = steps
            .iter()
            .map(|step| match step {
                Step::Seed(record) | Step::Insert(record) => record,
            })
            .max_by(|a, b| a.cmp_order(b));

        prop_assert_eq!(
            core.latest_event().map(EventRecord::order_key),
            expected.map(EventRecord::order_key)
        );
    }

    #[test]
    fn replaying_deliveries_changes_nothing(steps in prop::collection::vec(step(), 1..40)) {
        let mut core = core();
        apply(&mut core, &steps);

        let latest = core.latest_event().cloned();
        let pulses = core.pulses();
        let deadline = core.decay_deadline();

        apply(&mut core, &steps);

        prop_assert_eq!(core.latest_event().cloned(), latest);
        prop_assert_eq!(core.pulses(), pulses);
        prop_assert_eq!(core.decay_deadline(), deadline);
    }

    #[test]
    fn truncate_is_idempotent(content in ".{0,120}", max_len in 0usize..80) {
        let once = truncate(&content, max_len);
        prop_assert_eq!(truncate(&once, max_len), once.clone());

        if content.chars().count() <= max_len {
            prop_assert_eq!(once, content);
        } else {
            let prefix: String = content.chars().take(max_len).collect();
            prop_assert_eq!(once, format!("{prefix}{ELLIPSIS}"));
        }
    }
}
