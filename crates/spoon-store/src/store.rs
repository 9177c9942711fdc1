//! Room/message store.
//!
//! [`Store`] is the authoritative in-memory model. Event handlers mutate it,
//! the UI reads it, and the persister snapshots it. A single mutex covers the
//! rooms map, the messages map, the current-room pointer and the sync token
//! together, so every reader sees a joint view that resulted from a prefix of
//! fully applied operations.

#![allow(clippy::disallowed_types, reason = "Short synchronous critical sections only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{Message, Room, RoomId, SNAPSHOT_VERSION, Snapshot};

/// Shared room/message store.
///
/// Clone is cheap (Arc); clones observe and mutate the same state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreState>>,
}

/// Locked view of the store.
///
/// Handed to [`Store::read`] callers; everything reachable from it is
/// consistent for the duration of the call.
#[derive(Debug, Default)]
pub struct StoreState {
    rooms: HashMap<RoomId, Room>,
    messages: HashMap<RoomId, Vec<Message>>,
    current_room: Option<RoomId>,
    next_batch: Option<String>,
}

impl StoreState {
    /// All known rooms.
    pub fn rooms(&self) -> &HashMap<RoomId, Room> {
        &self.rooms
    }

    /// Room by identifier.
    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    /// Messages of a room in arrival order. Empty if the room is unknown.
    pub fn messages(&self, id: &str) -> &[Message] {
        self.messages.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Currently selected room. `None` if nothing is selected.
    pub fn current_room(&self) -> Option<&RoomId> {
        self.current_room.as_ref()
    }

    /// The selected room itself. `None` if nothing is selected.
    pub fn current_room_state(&self) -> Option<&Room> {
        self.current_room.as_ref().and_then(|id| self.rooms.get(id))
    }

    /// Messages of the selected room. Empty if nothing is selected or the room
    /// has no messages.
    pub fn current_room_messages(&self) -> &[Message] {
        self.current_room.as_ref().map(|id| self.messages(id.as_str())).unwrap_or_default()
    }

    /// Sync token recorded after the last fully applied batch.
    pub fn next_batch(&self) -> Option<&str> {
        self.next_batch.as_deref()
    }

    /// True if no room is known.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Total number of cached messages.
    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    fn ensure_room(&mut self, id: &RoomId) -> &mut Room {
        self.rooms.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(room_id = %id, "room created");
            Room::new(id.clone())
        })
    }

    fn append_message(&mut self, room_id: &RoomId, message: Message) {
        self.ensure_room(room_id);
        self.messages.entry(room_id.clone()).or_default().push(message);
    }
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state. A poisoned lock is recovered: every mutation completes
    /// within a single critical section, so the data is never left half
    /// applied.
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against a consistent view of the whole store.
    ///
    /// The lock is held for the duration of `f`; keep it short.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.lock())
    }

    /// Existing room for `id`, or a newly created bare room.
    pub fn ensure_room(&self, id: &RoomId) -> Room {
        self.lock().ensure_room(id).clone()
    }

    /// Overwrite the room's name, creating the room if unknown.
    ///
    /// Last write wins by arrival order; no timestamp comparison.
    pub fn set_room_name(&self, id: &RoomId, name: impl Into<String>) {
        let mut state = self.lock();
        state.ensure_room(id).name = name.into();
    }

    /// Apply a room-name state event: name and state key in one step.
    pub fn apply_room_name(&self, id: &RoomId, name: impl Into<String>, state_key: Option<String>) {
        let mut state = self.lock();
        let room = state.ensure_room(id);
        room.name = name.into();
        if state_key.is_some() {
            room.state_key = state_key;
        }
    }

    /// Append a message to the room's sequence, creating the room if unknown.
    pub fn append_message(&self, room_id: &RoomId, message: Message) {
        self.lock().append_message(room_id, message);
    }

    /// Select the room the UI is viewing.
    ///
    /// Returns `false` and leaves the selection unchanged if the room is
    /// unknown.
    pub fn select_current_room(&self, id: &RoomId) -> bool {
        let mut state = self.lock();
        if !state.rooms.contains_key(id) {
            return false;
        }
        state.current_room = Some(id.clone());
        true
    }

    /// Currently selected room.
    pub fn current_room(&self) -> Option<RoomId> {
        self.lock().current_room.clone()
    }

    /// Messages of the selected room. Empty when nothing is selected.
    pub fn current_room_messages(&self) -> Vec<Message> {
        self.lock().current_room_messages().to_vec()
    }

    /// Copy of all known rooms.
    pub fn rooms(&self) -> HashMap<RoomId, Room> {
        self.lock().rooms.clone()
    }

    /// Copy of a single room.
    pub fn room(&self, id: &str) -> Option<Room> {
        self.lock().room(id).cloned()
    }

    /// Copy of a room's messages.
    pub fn messages(&self, id: &str) -> Vec<Message> {
        self.lock().messages(id).to_vec()
    }

    /// Sync token recorded after the last fully applied batch.
    pub fn next_batch(&self) -> Option<String> {
        self.lock().next_batch.clone()
    }

    /// Record the sync token of a fully applied batch.
    pub fn set_next_batch(&self, token: impl Into<String>) {
        self.lock().next_batch = Some(token.into());
    }

    /// Number of known rooms.
    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }

    /// Total number of cached messages.
    pub fn message_count(&self) -> usize {
        self.lock().message_count()
    }

    /// Full image of the store. The current-room selection is not included.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            version: SNAPSHOT_VERSION,
            rooms: state.rooms.clone(),
            messages: state.messages.clone(),
            next_batch: state.next_batch.clone(),
        }
    }

    /// Replace the whole store with `snapshot`.
    ///
    /// Clears the current-room selection. Rooms that only appear in the
    /// message map are created so every room with messages is known.
    pub fn restore(&self, snapshot: Snapshot) {
        let Snapshot { rooms, messages, next_batch, .. } = snapshot;

        let mut state = self.lock();
        state.rooms = rooms;
        state.messages = messages;
        state.next_batch = next_batch;
        state.current_room = None;

        let orphaned: Vec<RoomId> =
            state.messages.keys().filter(|id| !state.rooms.contains_key(*id)).cloned().collect();
        for id in &orphaned {
            state.ensure_room(id);
        }

        tracing::debug!(
            rooms = state.rooms.len(),
            messages = state.message_count(),
            "store restored from snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageContent;

    fn msg(sender: &str, body: &str) -> Message {
        Message::new(MessageContent::text(body), sender, 0)
    }

    #[test]
    fn ensure_room_is_idempotent() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");

        let first = store.ensure_room(&id);
        store.set_room_name(&id, "General");
        let second = store.ensure_room(&id);

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "General");
        assert_eq!(store.room_count(), 1);
    }

    #[test]
    fn set_room_name_last_write_wins() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");

        store.set_room_name(&id, "A");
        store.set_room_name(&id, "B");
        store.set_room_name(&id, "B");

        assert_eq!(store.room("!r1:example.org").map(|r| r.name), Some("B".to_string()));
    }

    #[test]
    fn apply_room_name_keeps_existing_state_key() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");

        store.apply_room_name(&id, "A", Some(String::new()));
        store.apply_room_name(&id, "B", None);

        let room = store.room("!r1:example.org");
        assert_eq!(room.as_ref().map(|r| r.name.as_str()), Some("B"));
        assert_eq!(room.and_then(|r| r.state_key), Some(String::new()));
    }

    #[test]
    fn append_creates_room_on_demand() {
        let store = Store::new();
        let id = RoomId::from("!new:example.org");

        store.append_message(&id, msg("@alice:example.org", "hi"));

        let room = store.room("!new:example.org");
        assert!(room.is_some_and(|r| r.name.is_empty()));
        assert_eq!(store.messages("!new:example.org").len(), 1);
    }

    #[test]
    fn current_room_messages_empty_without_selection() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");
        store.append_message(&id, msg("@alice:example.org", "hi"));

        assert!(store.current_room_messages().is_empty());
    }

    #[test]
    fn current_room_messages_empty_for_room_without_messages() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");
        store.set_room_name(&id, "quiet");

        assert!(store.select_current_room(&id));
        assert!(store.current_room_messages().is_empty());
    }

    #[test]
    fn selecting_unknown_room_is_ignored() {
        let store = Store::new();
        let known = RoomId::from("!known:example.org");
        store.ensure_room(&known);
        assert!(store.select_current_room(&known));

        assert!(!store.select_current_room(&RoomId::from("!missing:example.org")));
        assert_eq!(store.current_room(), Some(known));
    }

    #[test]
    fn snapshot_excludes_selection_and_restore_clears_it() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");
        store.append_message(&id, msg("@alice:example.org", "hi"));
        store.set_next_batch("s42");
        assert!(store.select_current_room(&id));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.next_batch.as_deref(), Some("s42"));

        store.restore(snapshot);
        assert_eq!(store.current_room(), None);
        assert_eq!(store.message_count(), 1);
    }

    #[test]
    fn restore_creates_rooms_for_orphaned_messages() {
        let mut snapshot = Snapshot::empty();
        snapshot
            .messages
            .insert(RoomId::from("!orphan:example.org"), vec![msg("@bob:example.org", "hey")]);

        let store = Store::new();
        store.restore(snapshot);

        assert!(store.room("!orphan:example.org").is_some());
    }

    #[test]
    fn read_sees_joint_view() {
        let store = Store::new();
        let id = RoomId::from("!r1:example.org");
        store.set_room_name(&id, "General");
        store.append_message(&id, msg("@alice:example.org", "hi"));
        store.select_current_room(&id);

        let (name, count) = store.read(|state| {
            let name = state.current_room_state().map(|r| r.display_name().to_owned());
            (name, state.current_room_messages().len())
        });

        assert_eq!(name.as_deref(), Some("General"));
        assert_eq!(count, 1);
    }
}
