//! Session controller.
//!
//! Owns the client lifecycle:
//!
//! ```text
//! Unauthenticated --login()--> Authenticating --run()--> Syncing --> Terminated
//!        |                          |
//!        +----- login failure ------+-------------------------------> Terminated
//! ```
//!
//! `run` wires the [`EventRouter`] into a [`Syncer`], starts the background
//! [`Persister`], drives the transport's sync feed until cancellation or an
//! unrecoverable error, then stops the persister and writes one final
//! snapshot.

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use spoon_store::{RoomId, SnapshotError, SnapshotStore, Store};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    Credentials, EventRouter, LoginSession, Persister, RenderNotifier, SessionError, Syncer,
    Transport, persister,
};

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not logged in yet.
    Unauthenticated,
    /// Login in progress, or logged in and waiting for `run`.
    Authenticating,
    /// Sync feed running.
    Syncing,
    /// Stopped. Final state.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Syncing => "syncing",
            Self::Terminated => "terminated",
        };
        f.write_str(label)
    }
}

/// Session controller over a transport `T`.
///
/// Every method takes `&self`, so one `Arc<Session<T>>` can be shared between
/// the task running the sync feed and the UI sending messages.
pub struct Session<T: Transport> {
    transport: Arc<T>,
    store: Store,
    snapshots: Arc<dyn SnapshotStore>,
    notifier: RenderNotifier,
    state: watch::Sender<SessionState>,
    login: OnceLock<LoginSession>,
}

impl<T: Transport> Session<T> {
    /// Session over injected collaborators. Starts `Unauthenticated`.
    pub fn new(
        transport: Arc<T>,
        store: Store,
        snapshots: Arc<dyn SnapshotStore>,
        notifier: RenderNotifier,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self { transport, store, snapshots, notifier, state, login: OnceLock::new() }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Identity of the logged-in account, once login has succeeded.
    pub fn login_session(&self) -> Option<&LoginSession> {
        self.login.get()
    }

    /// Store shared with the router and the UI.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Load the persisted snapshot into the store.
    ///
    /// Never fails: a missing snapshot is a first run, and an unreadable one
    /// is logged, set aside and replaced by an empty store. Returns the number
    /// of rooms restored.
    pub fn restore(&self) -> usize {
        match self.snapshots.load() {
            Ok(snapshot) => {
                self.store.restore(snapshot);
                let rooms = self.store.room_count();
                tracing::info!(
                    store = %self.snapshots.describe(),
                    rooms,
                    messages = self.store.message_count(),
                    "state restored"
                );
                self.notifier.notify();
                rooms
            },
            Err(SnapshotError::NotFound { .. }) => {
                tracing::info!(store = %self.snapshots.describe(), "no snapshot, starting empty");
                0
            },
            Err(e) => {
                tracing::warn!(
                    store = %self.snapshots.describe(),
                    error = %e,
                    "snapshot unreadable, starting empty"
                );
                if matches!(e, SnapshotError::Decode(_) | SnapshotError::UnsupportedVersion { .. }) {
                    match self.snapshots.set_aside() {
                        Ok(Some(backup)) => tracing::info!(%backup, "unreadable snapshot kept"),
                        Ok(None) => {},
                        Err(e) => tracing::warn!(error = %e, "could not set unreadable snapshot aside"),
                    }
                }
                0
            },
        }
    }

    /// Authenticate with the transport.
    ///
    /// Any failure is fatal: the session moves to `Terminated` and
    /// [`SessionError::Auth`] is returned.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginSession, SessionError> {
        self.expect_state(SessionState::Unauthenticated)?;
        self.transition(SessionState::Authenticating);
        tracing::info!(homeserver = %credentials.homeserver, user = %credentials.username, "logging in");

        match self.transport.login(credentials).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, device_id = %session.device_id, "logged in");
                let _ = self.login.set(session.clone());
                Ok(session)
            },
            Err(e) => {
                tracing::error!(error = %e, "login failed");
                self.transition(SessionState::Terminated);
                Err(SessionError::Auth(e.to_string()))
            },
        }
    }

    /// Run the sync feed until `cancel` fires or the feed fails.
    ///
    /// Always ends `Terminated` with a final snapshot written. A feed failure
    /// also cancels `cancel`, so the rest of the process shuts down with it.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SessionError> {
        self.expect_state(SessionState::Authenticating)?;
        if self.login.get().is_none() {
            return Err(SessionError::InvalidState {
                expected: "logged in".into(),
                actual: "login pending".into(),
            });
        }
        self.transition(SessionState::Syncing);

        tokio::select! {
            () = cancel.cancelled() => {},
            () = self.bootstrap_rooms() => {},
        }

        let persist_cancel = cancel.child_token();
        let persister = Persister::new(self.store.clone(), Arc::clone(&self.snapshots));
        let router =
            Arc::new(EventRouter::new(self.store.clone(), persister.handle(), self.notifier.clone()));
        let persist_task = persister.spawn(persist_cancel.clone());

        let mut syncer = Syncer::new();
        router.register(&mut syncer);

        let since = self.store.next_batch();
        tracing::info!(since = since.as_deref().unwrap_or("-"), "sync started");

        let outcome = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("sync stopped by shutdown");
                Ok(())
            },
            result = self.transport.sync(since, &syncer) => match result {
                Ok(()) => {
                    tracing::info!("sync feed ended");
                    Ok(())
                },
                Err(e) => {
                    tracing::error!(error = %e, "sync failed");
                    Err(SessionError::Sync(e.to_string()))
                },
            },
        };

        persist_cancel.cancel();
        if let Err(e) = persist_task.await {
            tracing::warn!(error = %e, "persister did not stop cleanly");
        }
        if let Err(e) = persister::flush(&self.store, self.snapshots.as_ref()) {
            tracing::warn!(error = %e, "final snapshot write failed");
        }

        self.transition(SessionState::Terminated);
        cancel.cancel();
        outcome
    }

    /// Send a plain-text message to `room_id`.
    ///
    /// The message shows up in the store once the sync feed echoes it back.
    pub async fn send_message(&self, room_id: &RoomId, body: &str) -> Result<String, SessionError> {
        self.expect_state(SessionState::Syncing)?;

        let event_id = self
            .transport
            .send_message(room_id, body)
            .await
            .map_err(|e| SessionError::Send(e.to_string()))?;
        tracing::debug!(room_id = %room_id, event_id = %event_id, "message sent");
        Ok(event_id)
    }

    async fn bootstrap_rooms(&self) {
        match self.transport.joined_room_ids().await {
            Ok(ids) => {
                for id in &ids {
                    self.store.ensure_room(id);
                }
                tracing::debug!(rooms = ids.len(), "joined rooms fetched");
                self.notifier.notify();
            },
            Err(e) => tracing::warn!(error = %e, "cannot fetch joined rooms"),
        }
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        let actual = self.state();
        if actual == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState { expected: expected.to_string(), actual: actual.to_string() })
        }
    }

    fn transition(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = %previous, to = %next, "session state");
        self.notifier.notify();
    }
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("store", &self.snapshots.describe())
            .field("login", &self.login.get())
            .finish_non_exhaustive()
    }
}
