//! Event handling for the TUI

use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::{mpsc, watch};

use crate::sync::PulseView;

/// TUI events
#[derive(Debug, Clone)]
pub enum Event {
    /// Terminal tick (redraws relative times)
    Tick,
    /// Keyboard event
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// The pulse view changed
    Pulse(PulseView),
    /// The pulse session stopped publishing
    PulseClosed,
}

/// Handles events from the terminal and the pulse session
pub struct EventHandler {
    /// Sender for events
    tx: mpsc::UnboundedSender<Event>,
    /// Receiver for events
    rx: mpsc::UnboundedReceiver<Event>,
    /// Tick rate
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Get a sender to inject events
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Start polling the terminal
    pub fn start(&self) {
        let tick_rate = self.tick_rate;
        let tx = self.tx.clone();

        // crossterm polling blocks the thread
        tokio::task::spawn_blocking(move || {
            let mut last_tick = Instant::now();

            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                if event::poll(timeout).unwrap_or(false) {
                    let sent = match event::read() {
                        Ok(CrosstermEvent::Key(key)) => tx.send(Event::Key(key)),
                        Ok(CrosstermEvent::Resize(w, h)) => tx.send(Event::Resize(w, h)),
                        _ => Ok(()),
                    };
                    if sent.is_err() {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });
    }

    /// Forward pulse view updates into the event stream
    pub fn forward_views(&self, mut views: watch::Receiver<PulseView>) {
        let tx = self.tx.clone();

        tokio::spawn(async move {
            loop {
                if views.changed().await.is_err() {
                    let _ = tx.send(Event::PulseClosed);
                    break;
                }
                let view = views.borrow_and_update().clone();
                if tx.send(Event::Pulse(view)).is_err() {
                    break;
                }
            }
        });
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Check if a key event matches a key binding
pub fn key_match(key: KeyEvent, code: KeyCode, modifiers: KeyModifiers) -> bool {
    key.code == code && key.modifiers == modifiers
}

/// Check if key is quit command (q or Ctrl+C)
pub fn is_quit(key: KeyEvent) -> bool {
    key_match(key, KeyCode::Char('q'), KeyModifiers::NONE)
        || key_match(key, KeyCode::Char('c'), KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectionStatus;

    #[test]
    fn test_quit_keys() {
        assert!(is_quit(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
    }

    #[tokio::test]
    async fn test_forward_views() {
        let (view_tx, view_rx) = watch::channel(PulseView::default());
        let mut events = EventHandler::new(250);
        events.forward_views(view_rx);

        view_tx.send_modify(|view| view.status = ConnectionStatus::Subscribed);
        match events.next().await {
            Some(Event::Pulse(view)) => assert_eq!(view.status, ConnectionStatus::Subscribed),
            other => panic!("unexpected event: {other:?}"),
        }

        drop(view_tx);
        assert!(matches!(events.next().await, Some(Event::PulseClosed)));
    }
}
