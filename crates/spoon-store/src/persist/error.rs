//! Snapshot error types.
//!
//! Defines errors that can occur while persisting the store:
//! - `NotFound`: no snapshot has been written yet (first run)
//! - `Decode`: the snapshot exists but cannot be decoded
//! - `UnsupportedVersion`: the snapshot was written by a newer schema
//! - `Io`: the underlying file system failed

use std::{io, path::Path};

use thiserror::Error;

/// Errors that can occur during snapshot operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// No snapshot exists at the configured location.
    #[error("snapshot not found: {path}")]
    NotFound {
        /// Location that was probed.
        path: String,
    },

    /// Snapshot data is corrupt, truncated or empty.
    #[error("snapshot decode error: {0}")]
    Decode(String),

    /// Snapshot was written by a newer schema version.
    #[error("unsupported snapshot version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// Snapshot could not be encoded.
    #[error("snapshot encode error: {0}")]
    Encode(String),

    /// I/O error from the file system.
    #[error("I/O error: {0}")]
    Io(String),
}

impl SnapshotError {
    /// True if nothing has been persisted yet.
    ///
    /// This is the expected state on first run, not a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn not_found(path: &Path) -> Self {
        Self::NotFound { path: path.display().to_string() }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
