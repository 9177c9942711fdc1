//! Status bar
//!
//! Displays session state, account and the latest status message.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use spoon_app::SessionState;

use super::StatusInfo;
use crate::view::View;

/// Render the status bar.
pub fn render(frame: &mut Frame, view: &View, info: &StatusInfo<'_>, area: Rect) {
    let session_style = match info.session {
        SessionState::Syncing => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        SessionState::Authenticating => Style::default().fg(Color::Yellow),
        SessionState::Terminated => Style::default().fg(Color::Red),
        SessionState::Unauthenticated => Style::default(),
    };

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(info.session.to_string(), session_style),
        Span::raw(format!(" | {} | {}", info.user_id, info.homeserver)),
    ];
    if let Some(status) = view.status() {
        spans.push(Span::styled(format!(" | {status}"), Style::default().fg(Color::Yellow)));
    }

    let paragraph =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
