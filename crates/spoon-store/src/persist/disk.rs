//! File-backed snapshot store.
//!
//! Every save is a whole-file replace: the snapshot is written to a uniquely
//! named sibling temp file, flushed to disk and atomically renamed over the
//! target. A crash at any point leaves either the old or the new snapshot in
//! place, never a truncated one. Writers sharing a path, in this process or
//! another, never share a temp file.

#![allow(clippy::disallowed_types, reason = "Writer lock around synchronous file I/O")]

use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tempfile::{Builder, NamedTempFile};

use super::{SnapshotError, SnapshotStore, codec};
use crate::Snapshot;

const TEMP_SUFFIX: &str = ".tmp";
const BACKUP_SUFFIX: &str = ".bak";

/// Snapshot store backed by a single file.
///
/// Concurrent saves through the same instance are serialized by an internal
/// writer lock. Saves from other instances or processes write through their
/// own temp files, so the last rename wins and the file is always a
/// complete snapshot.
#[derive(Debug)]
pub struct DiskSnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskSnapshotStore {
    /// Store that reads and writes the snapshot at `path`.
    ///
    /// Nothing is touched on disk until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name prefix shared by this store's temp files: `.<file name>.`
    pub fn temp_prefix(&self) -> OsString {
        let mut prefix = OsString::from(".");
        prefix.push(self.path.file_name().unwrap_or_else(|| "snapshot".as_ref()));
        prefix.push(".");
        prefix
    }

    /// Where [`set_aside`](SnapshotStore::set_aside) moves an unreadable
    /// snapshot: `<file>.bak` next to it.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map_or_else(|| OsString::from("snapshot"), OsString::from);
        name.push(BACKUP_SUFFIX);
        self.path.with_file_name(name)
    }

    fn directory(&self) -> &Path {
        self.path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
    }

    fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = self.directory();
        fs::create_dir_all(dir)?;

        // Dropped, and so removed, on any failure before the rename.
        let mut temp = Builder::new().prefix(&self.temp_prefix()).suffix(TEMP_SUFFIX).tempfile_in(dir)?;
        write_and_sync(&mut temp, bytes)?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        // Persist the rename itself. Not every platform can open a directory
        // for syncing, so failures here are ignored.
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }

        Ok(())
    }
}

fn write_and_sync(temp: &mut NamedTempFile, bytes: &[u8]) -> io::Result<()> {
    temp.write_all(bytes)?;
    temp.as_file().sync_all()
}

impl SnapshotStore for DiskSnapshotStore {
    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let bytes = codec::encode(snapshot)?;

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_atomic(&bytes)?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = bytes.len(),
            rooms = snapshot.rooms.len(),
            messages = snapshot.message_count(),
            "snapshot written"
        );
        Ok(())
    }

    fn load(&self) -> Result<Snapshot, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SnapshotError::not_found(&self.path));
            },
            Err(e) => return Err(e.into()),
        };

        let snapshot = codec::decode(&bytes)?;
        tracing::debug!(
            path = %self.path.display(),
            rooms = snapshot.rooms.len(),
            messages = snapshot.message_count(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn set_aside(&self) -> Result<Option<String>, SnapshotError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let backup = self.backup_path();
        match fs::rename(&self.path, &backup) {
            Ok(()) => {
                tracing::warn!(from = %self.path.display(), to = %backup.display(), "snapshot set aside");
                Ok(Some(backup.display().to_string()))
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{Message, MessageContent, RoomId};

    fn sample() -> Snapshot {
        let id = RoomId::from("!r1:example.org");
        let mut snapshot = Snapshot::empty();
        snapshot.rooms.insert(id.clone(), crate::Room::new(id.clone()));
        snapshot.messages.insert(id, vec![Message::new(
            MessageContent::text("hello"),
            "@alice:example.org",
            1_700_000_000_000,
        )]);
        snapshot
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("state.cbor"));

        let err = store.load().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("state.cbor"));

        store.save(&sample()).unwrap();

        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("state.cbor"));

        store.save(&sample()).unwrap();

        assert!(store.path().exists());
        assert!(temp_files(&store).is_empty());
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("state.cbor"));

        store.save(&sample()).unwrap();
        store.save(&Snapshot::empty()).unwrap();

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("cache").join("spoon").join("state.cbor"));

        store.save(&sample()).unwrap();

        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn empty_file_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.cbor");
        fs::write(&path, b"").unwrap();

        let store = DiskSnapshotStore::new(path);
        assert!(matches!(store.load(), Err(SnapshotError::Decode(_))));
    }

    /// Temp files left next to the snapshot.
    fn temp_files(store: &DiskSnapshotStore) -> Vec<PathBuf> {
        let prefix = store.temp_prefix();
        let prefix = prefix.to_string_lossy();
        fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with(prefix.as_ref()))
            .collect()
    }

    #[test]
    fn failed_rename_keeps_previous_state_and_cleans_up() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("state");
        fs::create_dir(&target).unwrap();

        let store = DiskSnapshotStore::new(&target);
        let result = store.save(&sample());

        assert!(matches!(result, Err(SnapshotError::Io(_))));
        assert!(temp_files(&store).is_empty());
        assert!(target.is_dir());
    }

    #[test]
    fn set_aside_moves_snapshot_to_backup() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("state.cbor"));
        fs::write(store.path(), b"written by a newer build").unwrap();

        let moved = store.set_aside().unwrap();

        assert_eq!(moved, Some(store.backup_path().display().to_string()));
        assert!(!store.path().exists());
        assert_eq!(fs::read(store.backup_path()).unwrap(), b"written by a newer build");

        store.save(&sample()).unwrap();
        assert_eq!(fs::read(store.backup_path()).unwrap(), b"written by a newer build");
    }

    #[test]
    fn set_aside_without_snapshot_is_noop() {
        let dir = tempdir().unwrap();
        let store = DiskSnapshotStore::new(dir.path().join("state.cbor"));

        assert_eq!(store.set_aside(), Ok(None));
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn temp_prefix_names_the_snapshot() {
        let store = DiskSnapshotStore::new("/var/cache/spoon/state.cbor");
        assert_eq!(store.temp_prefix(), OsString::from(".state.cbor."));
    }

    #[test]
    fn concurrent_saves_from_separate_stores_all_succeed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.cbor");

        let snapshots: Vec<Snapshot> = (0..2u64)
            .map(|writer| {
                let id = crate::RoomId::new(format!("!writer{writer}:example.org"));
                let mut snapshot = Snapshot::empty();
                snapshot.rooms.insert(id.clone(), crate::Room::new(id.clone()));
                let messages = (0..2_000)
                    .map(|n| Message::new(MessageContent::text(format!("message {n}")), "@alice:example.org", n))
                    .collect();
                snapshot.messages.insert(id, messages);
                snapshot
            })
            .collect();

        std::thread::scope(|scope| {
            let workers: Vec<_> = snapshots
                .iter()
                .map(|snapshot| {
                    let store = DiskSnapshotStore::new(&path);
                    scope.spawn(move || (0..20).map(|_| store.save(snapshot)).filter(Result::is_err).count())
                })
                .collect();

            for worker in workers {
                assert_eq!(worker.join().unwrap(), 0, "every save succeeds");
            }
        });

        let store = DiskSnapshotStore::new(&path);
        let loaded = store.load().unwrap();
        assert!(snapshots.contains(&loaded), "the file holds one writer's complete snapshot");
        assert!(temp_files(&store).is_empty());
    }
}
