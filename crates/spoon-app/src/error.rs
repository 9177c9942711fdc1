//! Application error types.

use thiserror::Error;

/// Why an event could not be applied to the store.
///
/// Route errors never reach the sync feed: the registered handlers log them
/// and drop the event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Event was dispatched to a handler for a different type.
    #[error("expected {expected} event, got {found}")]
    WrongEventType {
        /// Type the handler accepts.
        expected: String,
        /// Type carried by the event.
        found: String,
    },

    /// Event content does not have the shape its type declares.
    #[error("malformed {event_type} content: {reason}")]
    MalformedContent {
        /// Declared event type.
        event_type: String,
        /// Deserializer message.
        reason: String,
    },
}

/// Errors surfaced by the session controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Login failed. Fatal; the session is terminated.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Sync feed failed and will not recover.
    #[error("sync failed: {0}")]
    Sync(String),

    /// Operation not valid in the current session state.
    #[error("invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: String,
        /// State the session was in.
        actual: String,
    },

    /// Sending a message failed. The session keeps running.
    #[error("send failed: {0}")]
    Send(String),
}
