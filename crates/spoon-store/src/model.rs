//! Room and message types.
//!
//! These are the cached view of protocol state: enough to render a room list
//! and a message timeline, nothing more.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Opaque, server-assigned room identifier (e.g. `!abc123:example.org`).
///
/// Never reused and never mutated once assigned.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A known room.
///
/// A room becomes known as soon as any event references it, so `name` may be
/// empty while the name event is still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Display name. Empty until a name event arrives.
    #[serde(default)]
    pub name: String,
    /// State key of the event that last named the room, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

impl Room {
    /// Bare room with no name and no state key.
    pub fn new(id: RoomId) -> Self {
        Self { id, name: String::new(), state_key: None }
    }

    /// Name to show in the UI. Falls back to the identifier while the name is
    /// pending.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { self.id.as_str() } else { &self.name }
    }

    /// True once a name event has been applied with a non-empty name.
    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Structured `m.room.message` content.
///
/// Only `body` is interpreted; the remaining fields are carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message kind (`m.text`, `m.notice`, `m.emote`, ...).
    pub msgtype: String,
    /// Plain-text body.
    pub body: String,
    /// Markup format of `formatted_body`, usually `org.matrix.custom.html`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Formatted body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

impl MessageContent {
    /// Plain `m.text` content.
    pub fn text(body: impl Into<String>) -> Self {
        Self { msgtype: "m.text".to_owned(), body: body.into(), format: None, formatted_body: None }
    }
}

/// A message in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message content.
    pub content: MessageContent,
    /// Fully qualified sender ID (`@alice:example.org`).
    pub sender: String,
    /// Server timestamp in milliseconds since the Unix epoch. Zero when the
    /// message was inserted out of band.
    #[serde(default)]
    pub timestamp_millis: u64,
}

impl Message {
    /// Create a message.
    pub fn new(content: MessageContent, sender: impl Into<String>, timestamp_millis: u64) -> Self {
        Self { content, sender: sender.into(), timestamp_millis }
    }

    /// Plain-text body.
    pub fn body(&self) -> &str {
        &self.content.body
    }

    /// Server timestamp. `None` when absent.
    pub fn timestamp(&self) -> Option<u64> {
        (self.timestamp_millis != 0).then_some(self.timestamp_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_id() {
        let mut room = Room::new(RoomId::from("!r1:example.org"));
        assert_eq!(room.display_name(), "!r1:example.org");
        assert!(!room.has_name());

        room.name = "General".into();
        assert_eq!(room.display_name(), "General");
    }

    #[test]
    fn zero_timestamp_is_absent() {
        let msg = Message::new(MessageContent::text("hi"), "@alice:example.org", 0);
        assert_eq!(msg.timestamp(), None);

        let msg = Message::new(MessageContent::text("hi"), "@alice:example.org", 1_600_000_000_000);
        assert_eq!(msg.timestamp(), Some(1_600_000_000_000));
    }
}
