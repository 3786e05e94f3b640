//! Main TUI application state and logic

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::watch;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::format::{RoleDirectory, DEFAULT_TRUNCATE_LEN};
use crate::models::{ConnectionStatus, EventRecord};
use crate::sync::PulseView;

use super::event::{is_quit, Event, EventHandler};

/// How long a status message stays on screen
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Main TUI application state
pub struct App {
    /// Whether the app should quit
    pub should_quit: bool,
    /// Show help overlay
    pub show_help: bool,
    /// Latest state published by the pulse session
    pub view: PulseView,
    /// Role labels and tones
    pub roles: RoleDirectory,
    /// Maximum characters of content shown
    pub truncate_len: usize,
    /// Past latest events, newest first
    pub history: VecDeque<EventRecord>,
    /// Number of past events kept
    pub history_limit: usize,
    /// Number of pulses seen since start
    pub pulse_count: u64,
    /// Status message
    pub status_message: Option<(String, Instant)>,
    /// Redraw rate
    pub tick_rate: Duration,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create a new TUI app
    pub fn new() -> Self {
        Self {
            should_quit: false,
            show_help: false,
            view: PulseView::default(),
            roles: RoleDirectory::new(),
            truncate_len: DEFAULT_TRUNCATE_LEN,
            history: VecDeque::new(),
            history_limit: 20,
            pulse_count: 0,
            status_message: None,
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Create an app using the configured roles, limits and tick rate
    pub fn from_config(config: &Config) -> Self {
        Self {
            roles: RoleDirectory::with_labels(&config.roles.labels),
            truncate_len: config.pulse.truncate_len,
            history_limit: config.tui.history,
            tick_rate: Duration::from_millis(config.tui.tick_rate_ms),
            ..Self::new()
        }
    }

    /// Handle key events
    pub fn handle_key(&mut self, key: KeyEvent) {
        if is_quit(key) {
            self.should_quit = true;
            return;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('?'), _) => {
                self.show_help = !self.show_help;
            }
            (KeyCode::Esc, KeyModifiers::NONE) => {
                self.show_help = false;
            }
            (KeyCode::Char('c'), KeyModifiers::NONE) => {
                self.history.clear();
                self.set_status("History cleared".to_string());
            }
            _ => {
                if self.show_help {
                    self.show_help = false;
                }
            }
        }
    }

    /// Apply a view published by the pulse session
    pub fn update_view(&mut self, view: PulseView) {
        if view.status != self.view.status {
            match view.status {
                ConnectionStatus::Subscribed if self.view.status == ConnectionStatus::Disconnected => {
                    self.set_status("Realtime connection restored".to_string());
                }
                ConnectionStatus::Disconnected => {
                    self.set_status("Realtime connection lost".to_string());
                }
                _ => {}
            }
        }

        if view.just_arrived && !self.view.just_arrived {
            self.pulse_count += 1;
        }

        if let Some(latest) = &view.latest {
            let changed = self.view.latest.as_ref().map(|e| &e.id) != Some(&latest.id);
            if changed {
                self.remember(latest.clone());
            }
        }

        self.view = view;
    }

    /// Fill the history with previously stored events, keeping it newest first
    pub fn backfill(&mut self, records: impl IntoIterator<Item = EventRecord>) {
        for record in records {
            if !self.history.iter().any(|e| e.id == record.id) {
                self.history.push_back(record);
            }
        }
        self.history.make_contiguous().sort_by(|a, b| b.cmp_order(a));
        self.history.truncate(self.history_limit);
    }

    fn remember(&mut self, record: EventRecord) {
        self.history.retain(|e| e.id != record.id);
        self.history.push_front(record);
        self.history.truncate(self.history_limit);
    }

    /// Set a status message that expires after a few seconds
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get current status message if not expired
    pub fn get_status(&self) -> Option<&str> {
        self.status_message.as_ref().and_then(|(msg, time)| {
            if time.elapsed() < STATUS_TTL {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    /// Run the dashboard until the user quits or the session stops
    pub async fn run(&mut self, views: watch::Receiver<PulseView>) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        };
        use ratatui::{backend::CrosstermBackend, Terminal};
        use std::io;

        self.view = views.borrow().clone();

        enable_raw_mode().map_err(|e| Error::tui(e.to_string()))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|e| Error::tui(e.to_string()))?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|e| Error::tui(e.to_string()))?;

        let tick_ms = u64::try_from(self.tick_rate.as_millis()).unwrap_or(u64::MAX);
        let mut events = EventHandler::new(tick_ms);
        events.start();
        events.forward_views(views);

        let result = self.event_loop(&mut terminal, &mut events).await;

        disable_raw_mode().map_err(|e| Error::tui(e.to_string()))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| Error::tui(e.to_string()))?;
        terminal.show_cursor().map_err(|e| Error::tui(e.to_string()))?;

        result
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut ratatui::Terminal<B>,
        events: &mut EventHandler,
    ) -> Result<()> {
        while !self.should_quit {
            terminal
                .draw(|frame| super::ui::draw(frame, self))
                .map_err(|e| Error::tui(e.to_string()))?;

            match events.next().await {
                Some(Event::Key(key)) => self.handle_key(key),
                Some(Event::Pulse(view)) => self.update_view(view),
                Some(Event::PulseClosed) => {
                    debug!("Pulse session closed, leaving dashboard");
                    self.should_quit = true;
                }
                Some(Event::Tick | Event::Resize(_, _)) => {}
                None => break,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: i64) -> EventRecord {
        EventRecord::new(
            id,
            Some("qa-security-sabine"),
            "Scan complete",
            Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap(),
        )
    }

    fn view(latest: Option<EventRecord>, status: ConnectionStatus, just_arrived: bool) -> PulseView {
        PulseView {
            latest,
            status,
            just_arrived,
        }
    }

    #[test]
    fn test_quit_and_help_keys() {
        let mut app = App::new();
        app.handle_key(KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE));
        assert!(app.show_help);
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.show_help);
        app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(app.should_quit);
    }

    #[test]
    fn test_history_tracks_distinct_latest_events() {
        let mut app = App::new();
        app.history_limit = 2;

        app.update_view(view(Some(record(1)), ConnectionStatus::Subscribed, true));
        app.update_view(view(Some(record(1)), ConnectionStatus::Subscribed, false));
        app.update_view(view(Some(record(2)), ConnectionStatus::Subscribed, true));
        app.update_view(view(Some(record(3)), ConnectionStatus::Subscribed, true));

        let ids: Vec<_> = app.history.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["3", "2"]);
        assert_eq!(app.pulse_count, 2);
    }

    #[test]
    fn test_backfill_orders_and_dedupes() {
        let mut app = App::new();
        app.history_limit = 3;

        app.backfill(vec![record(2), record(4), record(1), record(3)]);
        let ids: Vec<_> = app.history.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["4", "3", "2"]);

        // The seeded latest event is already in the history
        app.update_view(view(Some(record(4)), ConnectionStatus::Subscribed, false));
        app.update_view(view(Some(record(5)), ConnectionStatus::Subscribed, true));
        let ids: Vec<_> = app.history.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["5", "4", "3"]);
    }

    #[test]
    fn test_connection_changes_set_status() {
        let mut app = App::new();
        app.update_view(view(None, ConnectionStatus::Subscribed, false));
        assert_eq!(app.get_status(), None);

        app.update_view(view(None, ConnectionStatus::Disconnected, false));
        assert_eq!(app.get_status(), Some("Realtime connection lost"));

        app.update_view(view(None, ConnectionStatus::Subscribed, false));
        assert_eq!(app.get_status(), Some("Realtime connection restored"));
    }

    #[test]
    fn test_from_config_applies_labels() {
        let mut config = Config::default();
        config
            .roles
            .labels
            .insert("release-bot".to_string(), "Release Bot".to_string());
        config.tui.history = 5;

        let app = App::from_config(&config);
        assert_eq!(app.roles.display(Some("release-bot")), "Release Bot");
        assert_eq!(app.history_limit, 5);
    }
}
