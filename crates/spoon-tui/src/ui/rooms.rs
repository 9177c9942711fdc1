//! Rooms sidebar
//!
//! Displays known rooms sorted by name, marking the selected room and the
//! navigation cursor.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};
use spoon_store::StoreState;

use crate::view::{Focus, View, sorted_rooms};

const BORDER_SIZE: u16 = 2;
const SELECTED_PREFIX: &str = "> ";
const UNSELECTED_PREFIX: &str = "  ";

/// Render the rooms sidebar.
pub fn render(frame: &mut Frame, state: &StoreState, view: &View, area: Rect) {
    let rooms = sorted_rooms(state);
    let focused = view.focus() == Focus::Rooms;
    let cursor = view.cursor(rooms.len());

    let border_style =
        if focused { Style::default().fg(Color::Yellow) } else { Style::default() };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" Rooms ({}) ", rooms.len()));

    if rooms.is_empty() {
        let empty = ListItem::new(Line::from(Span::styled(
            "No rooms yet",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(List::new(vec![empty]).block(block), area);
        return;
    }

    let selected = state.current_room();
    let items: Vec<ListItem> = rooms
        .iter()
        .enumerate()
        .map(|(index, room)| {
            let is_selected = selected == Some(&room.id);
            let (prefix, mut style) = if is_selected {
                (SELECTED_PREFIX, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else if room.has_name() {
                (UNSELECTED_PREFIX, Style::default())
            } else {
                (UNSELECTED_PREFIX, Style::default().fg(Color::DarkGray))
            };
            if focused && index == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(room.display_name().to_owned(), style),
            ]))
        })
        .collect();

    // Keep the cursor row on screen.
    let visible_height = area.height.saturating_sub(BORDER_SIZE).max(1) as usize;
    let skip = cursor.saturating_sub(visible_height - 1);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}
