//! Restart and crash-recovery tests against a real file system.
//!
//! Each test simulates a process lifetime by building a fresh `Store` and
//! `DiskSnapshotStore` over the same path.

use std::fs;

use spoon_store::{
    DiskSnapshotStore, Message, MessageContent, RoomId, SnapshotError, SnapshotStore, Store,
};
use tempfile::tempdir;

fn populated_store() -> Store {
    let general = RoomId::from("!general:example.org");
    let random = RoomId::from("!random:example.org");

    let store = Store::new();
    store.set_room_name(&general, "General");
    store.append_message(
        &general,
        Message::new(MessageContent::text("hi"), "@alice:example.org", 1_700_000_000_000),
    );
    store.append_message(
        &general,
        Message::new(MessageContent::text("yo"), "@bob:example.org", 1_700_000_001_000),
    );
    store.ensure_room(&random);
    store.set_next_batch("s100_200");
    store
}

#[test]
fn state_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.cbor");

    let first_run = populated_store();
    DiskSnapshotStore::new(&path).save(&first_run.snapshot()).unwrap();
    drop(first_run);

    let second_run = Store::new();
    second_run.restore(DiskSnapshotStore::new(&path).load().unwrap());

    assert_eq!(second_run.room_count(), 2);
    assert_eq!(
        second_run.room("!general:example.org").map(|r| r.name),
        Some("General".to_string())
    );
    let bodies: Vec<String> = second_run
        .messages("!general:example.org")
        .iter()
        .map(|m| m.body().to_string())
        .collect();
    assert_eq!(bodies, ["hi", "yo"]);
    assert!(second_run.messages("!random:example.org").is_empty());
    assert_eq!(second_run.next_batch().as_deref(), Some("s100_200"));
    assert_eq!(second_run.current_room(), None);
}

#[test]
fn truncated_snapshot_is_a_decode_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.cbor");
    let disk = DiskSnapshotStore::new(&path);
    disk.save(&populated_store().snapshot()).unwrap();

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

    assert!(matches!(disk.load(), Err(SnapshotError::Decode(_))));
}

#[test]
fn empty_snapshot_file_is_not_an_empty_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.cbor");
    fs::write(&path, []).unwrap();

    let err = DiskSnapshotStore::new(&path).load().unwrap_err();
    assert!(!err.is_not_found());
    assert!(matches!(err, SnapshotError::Decode(_)));
}

#[test]
fn stray_temp_file_from_interrupted_save_is_ignored() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.cbor");
    let disk = DiskSnapshotStore::new(&path);
    let original = populated_store().snapshot();
    disk.save(&original).unwrap();

    // Crash after the temp write but before the rename.
    let mut stray = disk.temp_prefix();
    stray.push("interrupted.tmp");
    fs::write(dir.path().join(stray), b"half a snapsh").unwrap();

    assert_eq!(disk.load().unwrap(), original);
}

#[test]
fn stray_temp_file_does_not_block_next_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.cbor");
    let disk = DiskSnapshotStore::new(&path);
    let mut stray = disk.temp_prefix();
    stray.push("interrupted.tmp");
    let stray = dir.path().join(stray);
    fs::write(&stray, b"garbage").unwrap();

    let snapshot = populated_store().snapshot();
    disk.save(&snapshot).unwrap();

    assert_eq!(disk.load().unwrap(), snapshot);
    assert_eq!(fs::read(&stray).unwrap(), b"garbage");
}

#[test]
fn no_snapshot_means_first_run() {
    let dir = tempdir().unwrap();
    let disk = DiskSnapshotStore::new(dir.path().join("never-written.cbor"));

    let err = disk.load().unwrap_err();
    assert!(err.is_not_found());
}
