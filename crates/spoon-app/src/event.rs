//! Typed sync events.
//!
//! Transports decode the wire format into [`Event`] values; the content stays
//! raw JSON until a handler asks for a concrete shape with
//! [`Event::parse_content`].

use std::fmt;

use serde::{Deserialize, de::DeserializeOwned};
use spoon_store::RoomId;

use crate::RouteError;

/// Matrix event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// `m.room.message`
    RoomMessage,
    /// `m.room.name`
    RoomName,
    /// Any other type, kept verbatim.
    Other(String),
}

impl EventType {
    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::RoomMessage => "m.room.message",
            Self::RoomName => "m.room.name",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "m.room.message" => Self::RoomMessage,
            "m.room.name" => Self::RoomName,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Section of a sync batch an event was delivered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Room state (`rooms.join.*.state`).
    State,
    /// Room timeline (`rooms.join.*.timeline`).
    Timeline,
}

/// A room event as delivered by the sync feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Server-assigned event ID, absent for some synthetic events.
    pub event_id: Option<String>,
    /// Room the event belongs to.
    pub room_id: RoomId,
    /// Fully qualified sender ID.
    pub sender: String,
    /// Declared event type.
    pub event_type: EventType,
    /// State key; present only on state events.
    pub state_key: Option<String>,
    /// Server timestamp in milliseconds. Zero when absent.
    pub origin_server_ts: u64,
    /// Raw event content.
    pub content: serde_json::Value,
}

impl Event {
    /// Event with the given type and content, no ID, no state key and no
    /// timestamp.
    pub fn new(
        room_id: impl Into<RoomId>,
        event_type: EventType,
        sender: impl Into<String>,
        content: serde_json::Value,
    ) -> Self {
        Self {
            event_id: None,
            room_id: room_id.into(),
            sender: sender.into(),
            event_type,
            state_key: None,
            origin_server_ts: 0,
            content,
        }
    }

    /// Set the server timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, origin_server_ts: u64) -> Self {
        self.origin_server_ts = origin_server_ts;
        self
    }

    /// Set the state key.
    #[must_use]
    pub fn with_state_key(mut self, state_key: impl Into<String>) -> Self {
        self.state_key = Some(state_key.into());
        self
    }

    /// Deserialize the content as `T`, checking the declared type first.
    pub fn parse_content<T: DeserializeOwned>(&self, expected: &EventType) -> Result<T, RouteError> {
        if &self.event_type != expected {
            return Err(RouteError::WrongEventType {
                expected: expected.to_string(),
                found: self.event_type.to_string(),
            });
        }

        T::deserialize(&self.content).map_err(|e| RouteError::MalformedContent {
            event_type: self.event_type.to_string(),
            reason: e.to_string(),
        })
    }
}

/// `m.room.name` content. A missing name clears the room name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomNameContent {
    /// New display name.
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spoon_store::MessageContent;

    use super::*;

    #[test]
    fn event_type_names_round_trip() {
        for name in ["m.room.message", "m.room.name", "m.room.topic"] {
            assert_eq!(EventType::from(name).as_str(), name);
        }
        assert_eq!(EventType::from("m.room.topic"), EventType::Other("m.room.topic".into()));
    }

    #[test]
    fn parse_message_content() {
        let event = Event::new(
            "!r1:example.org",
            EventType::RoomMessage,
            "@alice:example.org",
            json!({"msgtype": "m.text", "body": "hi", "m.mentions": {}}),
        );

        let content: MessageContent = event.parse_content(&EventType::RoomMessage).unwrap();
        assert_eq!(content, MessageContent::text("hi"));
    }

    #[test]
    fn parse_rejects_wrong_type() {
        let event = Event::new(
            "!r1:example.org",
            EventType::RoomName,
            "@alice:example.org",
            json!({"name": "General"}),
        );

        let err = event.parse_content::<MessageContent>(&EventType::RoomMessage).unwrap_err();
        assert_eq!(err, RouteError::WrongEventType {
            expected: "m.room.message".into(),
            found: "m.room.name".into(),
        });
    }

    #[test]
    fn parse_rejects_mismatched_shape() {
        // Redacted message: the type survives, the content does not.
        let event =
            Event::new("!r1:example.org", EventType::RoomMessage, "@alice:example.org", json!({}));

        let err = event.parse_content::<MessageContent>(&EventType::RoomMessage).unwrap_err();
        assert!(matches!(err, RouteError::MalformedContent { .. }));
    }

    #[test]
    fn missing_room_name_is_empty() {
        let event =
            Event::new("!r1:example.org", EventType::RoomName, "@alice:example.org", json!({}));

        let content: RoomNameContent = event.parse_content(&EventType::RoomName).unwrap();
        assert!(content.name.is_empty());
    }
}
