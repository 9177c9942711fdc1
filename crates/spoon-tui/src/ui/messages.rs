//! Messages pane
//!
//! Displays the selected room's messages, newest at the bottom. Each message
//! is a header line (`sender  dd/mm/yyyy, HH:MM:SS`) followed by its body.

use chrono::{Local, TimeZone};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem},
};
use spoon_store::{Message, StoreState};

const BORDER_SIZE: u16 = 2;
const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

/// Format a millisecond Unix timestamp in `tz`.
///
/// Returns `None` for a zero (absent) or unrepresentable timestamp.
pub fn format_timestamp<Tz>(millis: u64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if millis == 0 {
        return None;
    }
    let millis = i64::try_from(millis).ok()?;
    tz.timestamp_millis_opt(millis).single().map(|time| time.format(TIMESTAMP_FORMAT).to_string())
}

/// Render the messages pane.
pub fn render(frame: &mut Frame, state: &StoreState, area: Rect) {
    let Some(room) = state.current_room_state() else {
        let block = Block::default().borders(Borders::ALL).title(" Messages ");
        frame.render_widget(List::new(vec![hint("Select a room with Enter")]).block(block), area);
        return;
    };

    let messages = state.current_room_messages();
    let title = format!(" {} | {} Messages ", room.display_name(), messages.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if messages.is_empty() {
        frame.render_widget(List::new(vec![hint("No messages yet")]).block(block), area);
        return;
    }

    // Walk back from the newest message until the pane is full.
    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let mut used = 0;
    let mut items: Vec<ListItem> = Vec::new();
    for message in messages.iter().rev() {
        let item = message_item(message);
        used += item.height();
        if used > visible_height && !items.is_empty() {
            break;
        }
        items.push(item);
    }
    items.reverse();

    frame.render_widget(List::new(items).block(block), area);
}

fn hint(text: &'static str) -> ListItem<'static> {
    ListItem::new(Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))))
}

fn message_item(message: &Message) -> ListItem<'static> {
    let mut header = vec![Span::styled(
        message.sender.clone(),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    )];
    if let Some(time) = format_timestamp(message.timestamp_millis, &Local) {
        header.push(Span::raw("  "));
        header.push(Span::styled(time, Style::default().fg(Color::DarkGray)));
    }

    let mut lines = vec![Line::from(header)];
    lines.extend(message.body().lines().map(|line| Line::from(line.to_owned())));
    ListItem::new(Text::from(lines))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn formats_day_first() {
        // 2015-05-27T14:10:24.653Z
        assert_eq!(format_timestamp(1_432_735_824_653, &Utc).as_deref(), Some("27/05/2015, 14:10:24"));
    }

    #[test]
    fn zero_timestamp_has_no_time() {
        assert_eq!(format_timestamp(0, &Utc), None);
    }

    #[test]
    fn out_of_range_timestamp_has_no_time() {
        assert_eq!(format_timestamp(u64::MAX, &Utc), None);
    }
}
