//! Serializable image of the store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Message, Room, RoomId};

/// Schema version written into every snapshot.
///
/// Bump when a change cannot be expressed as an additive, defaulted field.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Full image of the cached chat state.
///
/// Fields are identified by name on the wire, and unknown fields are ignored
/// on decode, so adding a defaulted field does not require a version bump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version. Snapshots without a version decode as version 0.
    #[serde(default)]
    pub version: u32,
    /// All known rooms.
    #[serde(default)]
    pub rooms: HashMap<RoomId, Room>,
    /// Messages per room, in arrival order.
    #[serde(default)]
    pub messages: HashMap<RoomId, Vec<Message>>,
    /// Sync token to resume the event feed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_batch: Option<String>,
}

impl Snapshot {
    /// Snapshot of an empty store at the current schema version.
    pub fn empty() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            rooms: HashMap::new(),
            messages: HashMap::new(),
            next_batch: None,
        }
    }

    /// True if the snapshot holds no rooms and no messages.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty() && self.messages.values().all(Vec::is_empty)
    }

    /// Total number of messages across all rooms.
    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
