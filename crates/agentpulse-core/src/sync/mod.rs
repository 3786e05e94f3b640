//! Realtime event synchronization
//!
//! [`EventSyncCore`] reconciles the startup snapshot with streamed inserts;
//! [`PulseSession`] owns a core together with its subscription and drives it.

mod clock;
mod decay;
mod engine;
mod session;
mod snapshot;
mod view;

pub use clock::{Clock, ManualClock, RuntimeClock};
pub use decay::DecayTimer;
pub use engine::{EventSyncCore, DEFAULT_DECAY_WINDOW};
pub use session::{PulseMessage, PulseSession};
pub use snapshot::{EventSource, SnapshotLoader};
pub use view::PulseView;
