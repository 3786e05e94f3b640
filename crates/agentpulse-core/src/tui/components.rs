//! Reusable TUI components

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
};

use crate::format::RoleTone;
use crate::models::ConnectionStatus;

/// Terminal color for a role badge
pub fn tone_color(tone: RoleTone) -> Color {
    match tone {
        RoleTone::Violet => Color::Magenta,
        RoleTone::Blue => Color::Blue,
        RoleTone::Emerald => Color::Green,
        RoleTone::Amber => Color::Yellow,
        RoleTone::Pink => Color::LightMagenta,
        RoleTone::Red => Color::Red,
        RoleTone::Neutral => Color::Gray,
    }
}

/// Connection indicator (colored dot with LIVE/OFFLINE label)
pub struct LiveIndicator {
    status: ConnectionStatus,
    pulsing: bool,
}

impl LiveIndicator {
    /// Indicator for `status`; `pulsing` highlights the dot
    pub fn new(status: ConnectionStatus, pulsing: bool) -> Self {
        Self { status, pulsing }
    }

    /// Render as a styled span
    pub fn to_span(&self) -> Span<'static> {
        let (symbol, color) = match (self.status, self.pulsing) {
            (ConnectionStatus::Subscribed, true) => ("◉", Color::LightGreen),
            (ConnectionStatus::Subscribed, false) => ("●", Color::Green),
            (ConnectionStatus::Connecting, _) => ("○", Color::Yellow),
            (ConnectionStatus::Disconnected, _) => ("○", Color::Red),
        };

        let mut style = Style::default().fg(color);
        if self.pulsing {
            style = style.add_modifier(Modifier::BOLD);
        }

        Span::styled(format!("{} {}", symbol, self.status.label()), style)
    }
}

/// Role badge with the role's label on its tone color
pub struct RoleBadge {
    label: String,
    tone: RoleTone,
}

impl RoleBadge {
    /// Badge for a resolved role label
    pub fn new(label: impl Into<String>, tone: RoleTone) -> Self {
        Self {
            label: label.into(),
            tone,
        }
    }

    /// Render as a styled span
    pub fn to_span(&self) -> Span<'static> {
        Span::styled(
            format!(" {} ", self.label),
            Style::default()
                .fg(Color::Black)
                .bg(tone_color(self.tone))
                .add_modifier(Modifier::BOLD),
        )
    }
}
