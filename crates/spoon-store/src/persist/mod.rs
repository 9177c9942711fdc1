//! Snapshot persistence.
//!
//! Trait-based abstraction for saving and loading a [`Snapshot`]. Whether
//! caching is available is decided when the [`SnapshotStore`] is constructed,
//! never by inspecting a concrete type at runtime.

mod codec;
mod disk;
mod error;
mod null;

pub use codec::{decode, encode};
pub use disk::DiskSnapshotStore;
pub use error::SnapshotError;
pub use null::NullSnapshotStore;

use crate::Snapshot;

/// Persistence capability for snapshots.
///
/// Must be Send + Sync: the background persister and the shutdown flush may
/// call into the same instance from different tasks. Synchronous by design;
/// async callers move calls onto a blocking thread.
pub trait SnapshotStore: Send + Sync + 'static {
    /// Replace the persisted snapshot with `snapshot`.
    ///
    /// # Invariants
    ///
    /// - Post: on `Ok`, a subsequent [`load`](SnapshotStore::load) returns an
    ///   equivalent snapshot
    /// - Post: on `Err`, the previously persisted snapshot is still loadable
    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// Load the persisted snapshot.
    ///
    /// Returns [`SnapshotError::NotFound`] when nothing was ever saved.
    fn load(&self) -> Result<Snapshot, SnapshotError>;

    /// Short description for log lines.
    fn describe(&self) -> String;

    /// Move an unreadable snapshot out of the way so the next
    /// [`save`](SnapshotStore::save) cannot overwrite it.
    ///
    /// Returns where it went, or `None` when there was nothing to keep.
    fn set_aside(&self) -> Result<Option<String>, SnapshotError> {
        Ok(None)
    }
}
