//! Fuzz target for store mutations
//!
//! Applies arbitrary operation sequences to a [`Store`] and checks it
//! against a simple model.
//!
//! # Invariants
//!
//! - Messages per room come back in append order
//! - Every room with messages is a known room
//! - Room names are last-write-wins
//! - A snapshot restores to an identical store (selection aside)

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spoon_store::{
    Message, MessageContent, RoomId, Store,
    persist::{decode, encode},
};

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Ensure { room: u8 },
    Name { room: u8, name: String },
    Append { room: u8, body: String, timestamp: u64 },
    Select { room: u8 },
    NextBatch { token: String },
}

fn room_id(n: u8) -> RoomId {
    RoomId::new(format!("!room{}:example.org", n % 8))
}

fuzz_target!(|ops: Vec<Op>| {
    let store = Store::new();
    let mut names: HashMap<RoomId, String> = HashMap::new();
    let mut bodies: HashMap<RoomId, Vec<String>> = HashMap::new();

    for op in ops {
        match op {
            Op::Ensure { room } => {
                store.ensure_room(&room_id(room));
            },
            Op::Name { room, name } => {
                store.set_room_name(&room_id(room), name.clone());
                names.insert(room_id(room), name);
            },
            Op::Append { room, body, timestamp } => {
                let id = room_id(room);
                store.append_message(&id, Message::new(MessageContent::text(body.clone()), "@fuzz:x", timestamp));
                bodies.entry(id).or_default().push(body);
            },
            Op::Select { room } => {
                store.select_current_room(&room_id(room));
            },
            Op::NextBatch { token } => store.set_next_batch(token),
        }
    }

    for (id, expected) in &bodies {
        let stored: Vec<String> = store.messages(id.as_str()).into_iter().map(|m| m.content.body).collect();
        assert_eq!(&stored, expected);
        assert!(store.room(id.as_str()).is_some());
    }
    for (id, name) in &names {
        assert_eq!(store.room(id.as_str()).map(|r| r.name), Some(name.clone()));
    }

    let snapshot = store.snapshot();
    let decoded = decode(&encode(&snapshot).expect("store snapshot encodes")).expect("snapshot decodes");
    assert_eq!(decoded, snapshot);

    let restored = Store::new();
    restored.restore(decoded);
    assert_eq!(restored.snapshot(), snapshot);
});
