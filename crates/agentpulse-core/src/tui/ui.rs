//! UI rendering for the TUI

use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::App;
use super::components::{tone_color, LiveIndicator, RoleBadge};
use crate::format::{format_relative_time, truncate};

/// Main colors
const PRIMARY: Color = Color::Cyan;
const SECONDARY: Color = Color::Magenta;
const MUTED: Color = Color::DarkGray;

/// Draw the entire UI
pub fn draw(frame: &mut Frame, app: &App) {
    let now = Utc::now();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(6), // Latest event
            Constraint::Min(5),    // Recent pulses
            Constraint::Length(1), // Status bar
        ])
        .split(frame.size());

    draw_header(frame, app, chunks[0]);
    draw_latest(frame, app, now, chunks[1]);
    draw_history(frame, app, now, chunks[2]);
    draw_status_bar(frame, app, chunks[3]);

    if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(12)])
        .split(area);

    let logo = Paragraph::new("AgentPulse").style(Style::default().fg(PRIMARY).bold());
    frame.render_widget(logo, chunks[0]);

    let indicator = LiveIndicator::new(app.view.status, app.view.just_arrived);
    let status = Paragraph::new(indicator.to_span()).alignment(Alignment::Right);
    frame.render_widget(status, chunks[1]);
}

fn draw_latest(frame: &mut Frame, app: &App, now: DateTime<Utc>, area: Rect) {
    let border = if app.view.just_arrived { PRIMARY } else { MUTED };
    let block = Block::default()
        .title("Latest")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));

    let lines = match &app.view.latest {
        None => vec![Line::from(Span::styled(
            "Waiting for agent activity...",
            Style::default().fg(MUTED).italic(),
        ))],
        Some(_) => {
            let label = app.view.role_label(&app.roles).unwrap_or_default();
            let badge = RoleBadge::new(label, app.view.role_tone(&app.roles));
            let when = app.view.time_ago(now).unwrap_or_default();
            let snippet = app.view.snippet(app.truncate_len).unwrap_or_default();

            vec![
                Line::from(vec![
                    badge.to_span(),
                    Span::raw("  "),
                    Span::styled(when, Style::default().fg(MUTED)),
                ]),
                Line::from(""),
                Line::from(Span::styled(snippet, Style::default().fg(Color::White))),
            ]
        }
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_history(frame: &mut Frame, app: &App, now: DateTime<Utc>, area: Rect) {
    let items: Vec<ListItem> = app
        .history
        .iter()
        .map(|event| {
            let role = event.role();
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:>9} ", format_relative_time(event.created_at, now)),
                    Style::default().fg(MUTED),
                ),
                Span::styled(
                    format!("{:<18} ", app.roles.display(role)),
                    Style::default().fg(tone_color(app.roles.tone(role))),
                ),
                Span::raw(truncate(&event.content, app.truncate_len)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!("Recent pulses ({})", app.pulse_count))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(MUTED)),
    );
    frame.render_widget(list, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let left_text = app
        .get_status()
        .map_or_else(|| "Press ? for help".to_string(), ToString::to_string);
    let left = Paragraph::new(left_text).style(Style::default().fg(MUTED));
    frame.render_widget(left, chunks[0]);

    let right_text = match &app.view.latest {
        Some(event) => format!("last id {}", event.id),
        None => "no events".to_string(),
    };
    let right = Paragraph::new(right_text)
        .style(Style::default().fg(MUTED))
        .alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn draw_help_overlay(frame: &mut Frame) {
    let area = centered_rect(50, 50, frame.size());

    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from("Keyboard Shortcuts").style(Style::default().fg(PRIMARY).bold()),
        Line::from(""),
        Line::from("Dashboard:").style(Style::default().fg(SECONDARY)),
        Line::from("  c                  Clear recent pulses"),
        Line::from(""),
        Line::from("General:").style(Style::default().fg(SECONDARY)),
        Line::from("  ?                  Toggle this help"),
        Line::from("  q / Ctrl+C         Quit"),
        Line::from(""),
        Line::from("Press any key to close").style(Style::default().fg(MUTED).italic()),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PRIMARY)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionStatus, EventRecord};
    use crate::sync::PulseView;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_waiting_state() {
        let app = App::new();
        let screen = render(&app);
        assert!(screen.contains("Waiting for agent activity"));
        assert!(screen.contains("OFFLINE"));
    }

    #[test]
    fn test_renders_latest_event() {
        let mut app = App::new();
        app.update_view(PulseView {
            latest: Some(EventRecord::new(
                1,
                Some("qa-security-sabine"),
                "Scan complete",
                Utc::now(),
            )),
            status: ConnectionStatus::Subscribed,
            just_arrived: true,
        });

        let screen = render(&app);
        assert!(screen.contains("QA & Security"));
        assert!(screen.contains("Scan complete"));
        assert!(screen.contains("just now"));
        assert!(screen.contains("LIVE"));
    }
}
