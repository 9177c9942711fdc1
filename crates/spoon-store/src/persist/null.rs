//! Snapshot store for runs without a cache.

use super::{SnapshotError, SnapshotStore};
use crate::Snapshot;

/// Snapshot store that persists nothing.
///
/// Saves succeed without effect and loads always report
/// [`SnapshotError::NotFound`], so every start is a first run.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSnapshotStore;

impl SnapshotStore for NullSnapshotStore {
    fn save(&self, _snapshot: &Snapshot) -> Result<(), SnapshotError> {
        Ok(())
    }

    fn load(&self) -> Result<Snapshot, SnapshotError> {
        Err(SnapshotError::NotFound { path: "<no cache>".to_string() })
    }

    fn describe(&self) -> String {
        "no cache".to_string()
    }
}
