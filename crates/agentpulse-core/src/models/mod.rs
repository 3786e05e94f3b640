//! Data models for AgentPulse

mod event;
mod status;

pub use event::*;
pub use status::*;
