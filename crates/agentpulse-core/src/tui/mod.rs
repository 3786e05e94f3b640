//! Terminal User Interface for AgentPulse
//!
//! Renders the pulse view: latest event, live indicator and a short history.

mod app;
mod components;
mod event;
mod ui;

pub use app::App;
pub use components::{tone_color, LiveIndicator, RoleBadge};
pub use event::{Event, EventHandler};
