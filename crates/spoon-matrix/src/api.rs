//! Client-server API wire types.
//!
//! Only the fields spoon reads are modelled; everything else is ignored on
//! decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use spoon_app::{Event, EventSource, EventType};
use spoon_store::RoomId;
use tracing::warn;

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub identifier: UserIdentifier<'a>,
    pub password: &'a str,
    pub initial_device_display_name: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub fn password(user: &'a str, password: &'a str) -> Self {
        Self {
            kind: "m.login.password",
            identifier: UserIdentifier { kind: "m.id.user", user },
            password,
            initial_device_display_name: "spoon",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    #[serde(default)]
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JoinedRoomsResponse {
    pub joined_rooms: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TextMessage<'a> {
    pub msgtype: &'static str,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendResponse {
    pub event_id: String,
}

/// Matrix standard error body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

impl ErrorBody {
    /// `errcode: error`, or the raw body when it is not a Matrix error.
    pub fn describe(raw: &str) -> String {
        match serde_json::from_str::<Self>(raw) {
            Ok(body) if !body.errcode.is_empty() => format!("{}: {}", body.errcode, body.error),
            _ => raw.chars().take(200).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SyncRooms {
    #[serde(default)]
    pub join: BTreeMap<String, JoinedRoom>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct JoinedRoom {
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: EventList,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EventList {
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
}

impl EventList {
    /// Decode each event on its own; a malformed one is logged and skipped.
    fn decode(
        self,
        room_id: &RoomId,
        source: EventSource,
    ) -> impl Iterator<Item = (EventSource, Event)> + '_ {
        self.events.into_iter().filter_map(move |value| match serde_json::from_value::<RawEvent>(value) {
            Ok(raw) => Some((source, raw.into_event(room_id))),
            Err(e) => {
                warn!(room = %room_id, ?source, error = %e, "dropping malformed sync event");
                None
            },
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub origin_server_ts: u64,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl RawEvent {
    fn into_event(self, room_id: &RoomId) -> Event {
        Event {
            event_id: self.event_id,
            room_id: room_id.clone(),
            sender: self.sender,
            event_type: EventType::from(self.event_type.as_str()),
            state_key: self.state_key,
            origin_server_ts: self.origin_server_ts,
            content: self.content,
        }
    }
}

impl SyncResponse {
    /// Flatten the batch into delivery order: room by room, each room's state
    /// section before its timeline.
    pub fn into_events(self) -> (String, Vec<(EventSource, Event)>) {
        let mut events = Vec::new();
        for (room_id, room) in self.rooms.join {
            let room_id = RoomId::new(room_id);
            events.extend(room.state.decode(&room_id, EventSource::State));
            events.extend(room.timeline.decode(&room_id, EventSource::Timeline));
        }
        (self.next_batch, events)
    }
}
