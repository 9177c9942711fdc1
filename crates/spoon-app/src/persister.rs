//! Background snapshot writer.
//!
//! One task owns every scheduled write. Scheduling is a non-blocking wake
//! that coalesces like the render notifier: any number of requests made
//! while a write is in flight produce exactly one follow-up write, which
//! captures everything applied up to that point. The encode and file I/O run
//! on the blocking pool so the sync feed never waits on disk.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use spoon_store::{SnapshotError, SnapshotStore, Store};
use tokio::{sync::Notify, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Non-blocking handle for scheduling a snapshot write. Clone is cheap.
#[derive(Debug, Clone)]
pub struct PersistHandle {
    wake: Arc<Notify>,
    scheduled: Arc<AtomicU64>,
}

impl PersistHandle {
    /// Request a snapshot write. Never blocks.
    pub fn schedule(&self) {
        self.scheduled.fetch_add(1, Ordering::Release);
        self.wake.notify_one();
    }

    /// Number of writes ever requested through this handle's persister.
    pub fn scheduled(&self) -> u64 {
        self.scheduled.load(Ordering::Acquire)
    }
}

/// Single-writer persistence task for a [`Store`].
pub struct Persister {
    store: Store,
    snapshots: Arc<dyn SnapshotStore>,
    handle: PersistHandle,
}

impl Persister {
    /// Persister that writes `store` through `snapshots`.
    pub fn new(store: Store, snapshots: Arc<dyn SnapshotStore>) -> Self {
        let handle =
            PersistHandle { wake: Arc::new(Notify::new()), scheduled: Arc::new(AtomicU64::new(0)) };
        Self { store, snapshots, handle }
    }

    /// Handle for scheduling writes.
    pub fn handle(&self) -> PersistHandle {
        self.handle.clone()
    }

    /// Run the task until `cancel` fires.
    ///
    /// A write already in flight when cancellation fires is completed before
    /// the task returns; a pending request that has not started is dropped
    /// (the caller's final flush covers it).
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    async fn run(self, cancel: CancellationToken) {
        tracing::debug!(store = %self.snapshots.describe(), "persister started");

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = self.handle.wake.notified() => {},
            }

            self.write().await;
        }

        tracing::debug!("persister stopped");
    }

    async fn write(&self) {
        let snapshot = self.store.snapshot();
        let snapshots = Arc::clone(&self.snapshots);

        match tokio::task::spawn_blocking(move || snapshots.save(&snapshot)).await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => tracing::warn!(error = %e, "background snapshot write failed"),
            Err(e) => tracing::warn!(error = %e, "background snapshot task failed"),
        }
    }
}

/// Write the current store synchronously.
///
/// Used once at shutdown, after the background task has stopped.
pub fn flush(store: &Store, snapshots: &dyn SnapshotStore) -> Result<(), SnapshotError> {
    let snapshot = store.snapshot();
    snapshots.save(&snapshot)?;
    tracing::info!(
        store = %snapshots.describe(),
        rooms = snapshot.rooms.len(),
        messages = snapshot.message_count(),
        "snapshot flushed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_types, reason = "Test-only recording store")]

    use std::{sync::Mutex, time::Duration};

    use spoon_store::{Message, MessageContent, RoomId, Snapshot};

    use super::*;

    /// Records every saved snapshot; optionally fails every save.
    #[derive(Default)]
    struct RecordingStore {
        saves: Mutex<Vec<Snapshot>>,
        fail: bool,
    }

    impl SnapshotStore for RecordingStore {
        fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
            self.saves.lock().unwrap().push(snapshot.clone());
            if self.fail { Err(SnapshotError::Io("disk full".into())) } else { Ok(()) }
        }

        fn load(&self) -> Result<Snapshot, SnapshotError> {
            self.saves.lock().unwrap().last().cloned().ok_or(SnapshotError::NotFound {
                path: "memory".into(),
            })
        }

        fn describe(&self) -> String {
            "memory".into()
        }
    }

    async fn wait_for_saves(snapshots: &RecordingStore, count: usize) {
        for _ in 0..500 {
            if snapshots.saves.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(snapshots.saves.lock().unwrap().len() >= count, "expected {count} saves");
    }

    #[tokio::test]
    async fn scheduled_write_captures_store() {
        let store = Store::new();
        let snapshots = Arc::new(RecordingStore::default());
        let persister = Persister::new(store.clone(), snapshots.clone());
        let handle = persister.handle();
        let cancel = CancellationToken::new();
        let task = persister.spawn(cancel.clone());

        store.append_message(
            &RoomId::from("!r1:example.org"),
            Message::new(MessageContent::text("hi"), "@alice:example.org", 0),
        );
        handle.schedule();
        wait_for_saves(&snapshots, 1).await;

        cancel.cancel();
        task.await.unwrap();

        let last = snapshots.load().unwrap();
        assert_eq!(last.message_count(), 1);
        assert_eq!(handle.scheduled(), 1);
    }

    #[tokio::test]
    async fn failed_write_does_not_stop_the_task() {
        let store = Store::new();
        let snapshots = Arc::new(RecordingStore { fail: true, ..RecordingStore::default() });
        let persister = Persister::new(store, snapshots.clone());
        let handle = persister.handle();
        let cancel = CancellationToken::new();
        let task = persister.spawn(cancel.clone());

        handle.schedule();
        wait_for_saves(&snapshots, 1).await;
        handle.schedule();
        wait_for_saves(&snapshots, 2).await;

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_without_requests_writes_nothing() {
        let snapshots = Arc::new(RecordingStore::default());
        let persister = Persister::new(Store::new(), snapshots.clone());
        let cancel = CancellationToken::new();
        let task = persister.spawn(cancel.clone());

        cancel.cancel();
        task.await.unwrap();

        assert!(snapshots.saves.lock().unwrap().is_empty());
    }

    #[test]
    fn flush_writes_current_state() {
        let store = Store::new();
        store.set_next_batch("s9");
        let snapshots = RecordingStore::default();

        flush(&store, &snapshots).unwrap();

        assert_eq!(snapshots.load().unwrap().next_batch.as_deref(), Some("s9"));
    }

    #[test]
    fn flush_surfaces_write_failure() {
        let snapshots = RecordingStore { fail: true, ..RecordingStore::default() };

        assert!(matches!(flush(&Store::new(), &snapshots), Err(SnapshotError::Io(_))));
    }
}
