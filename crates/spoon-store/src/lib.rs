//! State cache for spoon
//!
//! The in-memory model of every room and message the client has observed,
//! plus the snapshot codec that carries that model across restarts.
//!
//! # Components
//!
//! - [`Store`]: shared room/message model behind one coarse lock
//! - [`Snapshot`]: serializable image of the store
//! - [`SnapshotStore`]: persistence capability, implemented by
//!   [`DiskSnapshotStore`] and [`NullSnapshotStore`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod model;
pub mod persist;
mod snapshot;
mod store;

pub use model::{Message, MessageContent, Room, RoomId};
pub use persist::{DiskSnapshotStore, NullSnapshotStore, SnapshotError, SnapshotStore};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use store::{Store, StoreState};
