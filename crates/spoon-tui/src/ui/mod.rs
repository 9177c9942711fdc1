//! UI rendering
//!
//! Rendering functions that convert store and view state into terminal
//! output using ratatui widgets. All functions are pure (no I/O): the runtime
//! re-reads the whole store under its lock and redraws everything.

mod input;
mod messages;
mod rooms;
mod status;

pub use messages::format_timestamp;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::Paragraph,
};
use spoon_app::SessionState;
use spoon_store::StoreState;

use crate::view::View;

const HEADER: &str = "bend the spoon";

/// Account details shown in the status bar.
#[derive(Debug, Clone, Copy)]
pub struct StatusInfo<'a> {
    /// Session lifecycle state.
    pub session: SessionState,
    /// Logged-in user ID.
    pub user_id: &'a str,
    /// Homeserver URL.
    pub homeserver: &'a str,
}

/// Render the entire UI.
pub fn render(frame: &mut Frame, state: &StoreState, view: &View, info: &StatusInfo<'_>) {
    const HEADER_HEIGHT: u16 = 1;
    const MAIN_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(MAIN_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [header_area, main_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    render_header(frame, *header_area);
    render_main_area(frame, state, view, *main_area);
    input::render(frame, view, *input_area);
    status::render(frame, view, info, *status_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(HEADER)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD));
    frame.render_widget(header, area);
}

/// Render the main area (rooms sidebar + messages).
fn render_main_area(frame: &mut Frame, state: &StoreState, view: &View, area: Rect) {
    const ROOM_SIDEBAR_WIDTH: u16 = 24;
    const MESSAGES_AREA_MIN_WIDTH: u16 = 20;

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(ROOM_SIDEBAR_WIDTH), Constraint::Min(MESSAGES_AREA_MIN_WIDTH)])
        .split(area);

    let [rooms_area, messages_area] = chunks.as_ref() else {
        return;
    };

    rooms::render(frame, state, view, *rooms_area);
    messages::render(frame, state, *messages_area);
}
