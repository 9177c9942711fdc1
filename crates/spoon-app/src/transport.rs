//! Transport abstraction.
//!
//! The [`Transport`] trait is the only seam between the application core and
//! the chat protocol. The production implementation speaks the Matrix HTTP
//! API; tests script it.

use std::{fmt, future::Future};

use spoon_store::RoomId;
use thiserror::Error;

use crate::Syncer;

/// Login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Homeserver base URL, e.g. `https://matrix.org`.
    pub homeserver: String,
    /// Localpart or fully qualified user ID.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("homeserver", &self.homeserver)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity granted by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    /// Fully qualified user ID.
    pub user_id: String,
    /// Device ID assigned by the server.
    pub device_id: String,
}

/// Errors reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Credentials or access token rejected. Never retried.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Server answered with an error status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Matrix `errcode`/`error` or the raw body.
        message: String,
    },

    /// Request could not be completed (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// True if retrying the same request may succeed.
    ///
    /// Network failures, rate limiting and server-side errors are transient;
    /// authentication, client errors and decode failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Auth(_) | Self::Decode(_) => false,
        }
    }
}

/// Chat protocol collaborator.
///
/// Implementations own retry and backoff; an error returned from
/// [`Transport::sync`] is unrecoverable.
pub trait Transport: Send + Sync + 'static {
    /// Authenticate and keep the resulting access token for later calls.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginSession, TransportError>> + Send;

    /// Rooms the account has joined.
    fn joined_room_ids(&self) -> impl Future<Output = Result<Vec<RoomId>, TransportError>> + Send;

    /// Send a plain-text message. Returns the event ID.
    fn send_message(
        &self,
        room_id: &RoomId,
        body: &str,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Run the sync feed, starting after `since` (or from scratch).
    ///
    /// Every event is handed to [`Syncer::dispatch`] in delivery order and
    /// every batch is closed with [`Syncer::complete_batch`]. Runs until an
    /// unrecoverable error; callers stop it by dropping the future.
    fn sync(
        &self,
        since: Option<String>,
        syncer: &Syncer,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
