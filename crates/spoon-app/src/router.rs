//! Event router.
//!
//! Translates typed sync events into store mutations. Each handler applies
//! an event's whole effect in one store critical section, then schedules a
//! snapshot write and a redraw without waiting for either. Malformed events
//! are logged and dropped; nothing propagates back into the sync feed.

use std::sync::Arc;

use spoon_store::{Message, MessageContent, Store};

use crate::{
    Event, EventSource, EventType, PersistHandle, RenderNotifier, RoomNameContent, RouteError,
    Syncer,
};

/// Applies sync events to the store.
#[derive(Debug)]
pub struct EventRouter {
    store: Store,
    persist: PersistHandle,
    notifier: RenderNotifier,
}

impl EventRouter {
    /// Router over `store` that schedules writes through `persist` and
    /// redraws through `notifier`.
    pub fn new(store: Store, persist: PersistHandle, notifier: RenderNotifier) -> Self {
        Self { store, persist, notifier }
    }

    /// Register the message, room-name and batch-completion handlers.
    pub fn register(self: &Arc<Self>, syncer: &mut Syncer) {
        let router = Arc::clone(self);
        syncer.on_event_type(EventType::RoomMessage, move |source, event| {
            if let Err(e) = router.handle_message(source, event) {
                drop_event(source, event, &e);
            }
        });

        let router = Arc::clone(self);
        syncer.on_event_type(EventType::RoomName, move |source, event| {
            if let Err(e) = router.handle_room_name(source, event) {
                drop_event(source, event, &e);
            }
        });

        let router = Arc::clone(self);
        syncer.on_batch_complete(move |next_batch| router.handle_batch_complete(next_batch));
    }

    /// Append an `m.room.message` event to its room.
    pub fn handle_message(&self, source: EventSource, event: &Event) -> Result<(), RouteError> {
        let content: MessageContent = event.parse_content(&EventType::RoomMessage)?;
        tracing::trace!(
            room_id = %event.room_id,
            sender = %event.sender,
            ?source,
            msgtype = %content.msgtype,
            "message"
        );

        let message = Message::new(content, event.sender.clone(), event.origin_server_ts);
        self.store.append_message(&event.room_id, message);
        self.changed();
        Ok(())
    }

    /// Apply an `m.room.name` event to its room.
    pub fn handle_room_name(&self, source: EventSource, event: &Event) -> Result<(), RouteError> {
        let content: RoomNameContent = event.parse_content(&EventType::RoomName)?;
        tracing::trace!(room_id = %event.room_id, name = %content.name, ?source, "room name");

        self.store.apply_room_name(&event.room_id, content.name, event.state_key.clone());
        self.changed();
        Ok(())
    }

    /// Record the sync token of a fully applied batch.
    pub fn handle_batch_complete(&self, next_batch: &str) {
        self.store.set_next_batch(next_batch);
        self.persist.schedule();
    }

    fn changed(&self) {
        self.persist.schedule();
        self.notifier.notify();
    }
}

fn drop_event(source: EventSource, event: &Event, error: &RouteError) {
    tracing::warn!(
        room_id = %event.room_id,
        event_id = event.event_id.as_deref().unwrap_or("-"),
        ?source,
        %error,
        "dropping event"
    );
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spoon_store::{NullSnapshotStore, RoomId};

    use super::*;
    use crate::Persister;

    struct Fixture {
        store: Store,
        persist: PersistHandle,
        notifier: RenderNotifier,
        syncer: Syncer,
    }

    fn fixture() -> Fixture {
        let store = Store::new();
        let persist = Persister::new(store.clone(), Arc::new(NullSnapshotStore)).handle();
        let notifier = RenderNotifier::new();
        let router = Arc::new(EventRouter::new(store.clone(), persist.clone(), notifier.clone()));
        let mut syncer = Syncer::new();
        router.register(&mut syncer);
        Fixture { store, persist, notifier, syncer }
    }

    fn message(room: &str, sender: &str, body: &str) -> Event {
        Event::new(
            room,
            EventType::RoomMessage,
            sender,
            json!({"msgtype": "m.text", "body": body}),
        )
        .with_timestamp(1_700_000_000_000)
    }

    fn room_name(room: &str, name: &str) -> Event {
        Event::new(room, EventType::RoomName, "@admin:example.org", json!({"name": name}))
            .with_state_key("")
    }

    #[test]
    fn message_is_appended_with_sender_and_timestamp() {
        let f = fixture();

        f.syncer.dispatch(EventSource::Timeline, &message("!r1:example.org", "@alice:example.org", "hi"));

        let messages = f.store.messages("!r1:example.org");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, "@alice:example.org");
        assert_eq!(messages[0].body(), "hi");
        assert_eq!(messages[0].timestamp(), Some(1_700_000_000_000));
    }

    #[test]
    fn room_name_records_state_key() {
        let f = fixture();

        f.syncer.dispatch(EventSource::State, &room_name("!r1:example.org", "General"));

        let room = f.store.room("!r1:example.org").unwrap();
        assert_eq!(room.name, "General");
        assert_eq!(room.state_key.as_deref(), Some(""));
    }

    #[test]
    fn duplicate_name_event_is_idempotent() {
        let f = fixture();
        let event = room_name("!r1:example.org", "General");

        f.syncer.dispatch(EventSource::State, &event);
        f.syncer.dispatch(EventSource::Timeline, &event);

        assert_eq!(f.store.room_count(), 1);
        assert_eq!(f.store.room("!r1:example.org").map(|r| r.name), Some("General".into()));
    }

    #[test]
    fn every_applied_event_schedules_write_and_redraw() {
        let f = fixture();

        f.syncer.dispatch(EventSource::State, &room_name("!r1:example.org", "General"));
        f.syncer.dispatch(EventSource::Timeline, &message("!r1:example.org", "@bob:example.org", "yo"));

        assert_eq!(f.persist.scheduled(), 2);
        assert_eq!(f.notifier.generation(), 2);
    }

    #[test]
    fn malformed_message_is_dropped_without_side_effects() {
        let f = fixture();
        let redacted = Event::new(
            "!r1:example.org",
            EventType::RoomMessage,
            "@alice:example.org",
            json!({}),
        );

        assert_eq!(f.syncer.dispatch(EventSource::Timeline, &redacted), 1);

        assert_eq!(f.store.room_count(), 0);
        assert_eq!(f.persist.scheduled(), 0);
        assert_eq!(f.notifier.generation(), 0);
    }

    #[test]
    fn direct_call_with_wrong_type_is_rejected() {
        let store = Store::new();
        let persist = Persister::new(store.clone(), Arc::new(NullSnapshotStore)).handle();
        let router = EventRouter::new(store.clone(), persist, RenderNotifier::new());

        let result = router.handle_room_name(
            EventSource::Timeline,
            &message("!r1:example.org", "@alice:example.org", "hi"),
        );

        assert!(matches!(result, Err(RouteError::WrongEventType { .. })));
        assert!(store.room("!r1:example.org").is_none());
    }

    #[test]
    fn batch_completion_records_token() {
        let f = fixture();

        f.syncer.complete_batch("s72594_4483_1934");

        assert_eq!(f.store.next_batch().as_deref(), Some("s72594_4483_1934"));
        assert_eq!(f.persist.scheduled(), 1);
        assert_eq!(f.notifier.generation(), 0);
    }

    #[test]
    fn unseen_room_is_created_by_first_event() {
        let f = fixture();

        f.syncer.dispatch(EventSource::Timeline, &message("!new:example.org", "@carol:example.org", "first"));

        let room = f.store.room("!new:example.org").unwrap();
        assert_eq!(room.id, RoomId::from("!new:example.org"));
        assert!(!room.has_name());
    }
}
