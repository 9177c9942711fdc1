//! Application core for spoon
//!
//! Everything between the protocol transport and the terminal: typed sync
//! events, the handler registry they are dispatched through, the router that
//! applies them to the [`Store`](spoon_store::Store), and the session that
//! owns login, the sync feed and graceful shutdown.
//!
//! # Components
//!
//! - [`Syncer`]: handler registry keyed by event type, driven by a transport
//! - [`EventRouter`]: applies message and room-name events to the store
//! - [`RenderNotifier`]: coalescing "state changed" signal for the UI
//! - [`Persister`]: single-writer background snapshot task
//! - [`Transport`]: trait for the protocol collaborator (login, sync, send)
//! - [`Session`]: login, sync lifecycle and final flush

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod event;
mod notifier;
mod persister;
mod router;
mod session;
mod signal;
mod syncer;
mod transport;

pub use error::{RouteError, SessionError};
pub use event::{Event, EventSource, EventType, RoomNameContent};
pub use notifier::RenderNotifier;
pub use persister::{PersistHandle, Persister, flush};
pub use router::EventRouter;
pub use session::{Session, SessionState};
pub use signal::shutdown_signal;
pub use syncer::Syncer;
pub use transport::{Credentials, LoginSession, Transport, TransportError};
