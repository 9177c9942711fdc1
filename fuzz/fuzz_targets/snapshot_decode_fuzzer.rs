//! Fuzz target for snapshot decoding
//!
//! The snapshot file is read back on every start, so a damaged or hostile
//! file must be rejected, never trusted.
//!
//! # Strategy
//!
//! - Random bytes: completely arbitrary file contents
//! - Truncated: a valid snapshot cut at an arbitrary offset
//! - Deeply nested: CBOR arrays/maps nested to arbitrary depth
//! - Huge lengths: CBOR claiming massive string/array lengths
//! - Bit flips: a valid snapshot with one byte corrupted
//!
//! # Invariants
//!
//! - Decoding completes quickly and NEVER panics
//! - A decoded snapshot re-encodes and decodes to itself
//! - Huge claimed lengths are rejected, not allocated

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spoon_store::{
    Message, MessageContent, RoomId, Store,
    persist::{decode, encode},
};

#[derive(Debug, Clone, Arbitrary)]
enum SnapshotInput {
    RandomBytes { bytes: Vec<u8> },
    Truncated { cut: u16 },
    DeeplyNested { depth: u8, map: bool },
    HugeLength { claimed_len_exponent: u8 },
    BitFlip { offset: u16, mask: u8 },
}

fuzz_target!(|input: SnapshotInput| {
    let bytes = match input {
        SnapshotInput::RandomBytes { bytes } => bytes,
        SnapshotInput::Truncated { cut } => {
            let valid = sample_snapshot();
            let cut = usize::from(cut) % (valid.len() + 1);
            valid[..cut].to_vec()
        },
        SnapshotInput::DeeplyNested { depth, map } => nested(usize::from(depth), map),
        SnapshotInput::HugeLength { claimed_len_exponent } => {
            let claimed = 1u64 << (claimed_len_exponent % 64);
            // Top-level map with a "rooms" key whose value claims `claimed` entries.
            let mut bytes = vec![0xA1, 0x65];
            bytes.extend_from_slice(b"rooms");
            bytes.push(0xBB);
            bytes.extend_from_slice(&claimed.to_be_bytes());
            bytes
        },
        SnapshotInput::BitFlip { offset, mask } => {
            let mut valid = sample_snapshot();
            let offset = usize::from(offset) % valid.len();
            valid[offset] ^= mask;
            valid
        },
    };

    if let Ok(snapshot) = decode(&bytes) {
        let encoded = encode(&snapshot).expect("decoded snapshot must re-encode");
        let again = decode(&encoded).expect("re-encoded snapshot must decode");
        assert_eq!(again, snapshot);

        let store = Store::new();
        store.restore(snapshot);
        assert!(store.current_room().is_none());
    }
});

fn sample_snapshot() -> Vec<u8> {
    let store = Store::new();
    let room = RoomId::from("!general:example.org");
    store.ensure_room(&room);
    store.set_room_name(&room, "General");
    store.append_message(&room, Message::new(MessageContent::text("hello"), "@alice:example.org", 1));
    store.set_next_batch("s1");
    encode(&store.snapshot()).expect("sample snapshot encodes")
}

fn nested(depth: usize, map: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    for _ in 0..depth {
        if map {
            bytes.extend_from_slice(&[0xA1, 0x61, b'a']);
        } else {
            bytes.push(0x81);
        }
    }
    bytes.push(0x01);
    bytes
}
