//! reqwest-based Matrix transport.

#![allow(clippy::disallowed_types, reason = "Access token guarded by a short synchronous lock")]

use std::{
    fmt,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rand::Rng;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use spoon_app::{Credentials, LoginSession, Syncer, Transport, TransportError};
use spoon_store::RoomId;

use crate::{
    RetryPolicy,
    api::{ErrorBody, JoinedRoomsResponse, LoginRequest, LoginResponse, SendResponse, SyncResponse, TextMessage},
};

/// Slack added to the long-poll timeout for the HTTP request timeout.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(30);

/// Transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// How long the server may hold a `/sync` request open.
    pub sync_timeout: Duration,
    /// Backoff for transient `/sync` failures.
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { sync_timeout: Duration::from_secs(30), retry: RetryPolicy::default() }
    }
}

/// Homeserver and access token from a successful login.
#[derive(Clone)]
struct Authorized {
    base: Url,
    access_token: String,
}

/// Matrix client-server transport.
pub struct MatrixTransport {
    http: Client,
    config: TransportConfig,
    auth: RwLock<Option<Authorized>>,
    txn_prefix: String,
    txn_counter: AtomicU64,
}

impl MatrixTransport {
    /// Transport with default settings.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(TransportConfig::default())
    }

    /// Transport with explicit settings.
    pub fn with_config(config: TransportConfig) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(config.sync_timeout + REQUEST_TIMEOUT_MARGIN)
            .user_agent(concat!("spoon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(format!("cannot build HTTP client: {e}")))?;

        let txn_prefix = format!("spoon{:08x}", rand::rng().random::<u32>());
        Ok(Self { http, config, auth: RwLock::new(None), txn_prefix, txn_counter: AtomicU64::new(0) })
    }

    fn authorized(&self) -> Result<Authorized, TransportError> {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| TransportError::Auth("not logged in".to_owned()))
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("{}.{n}", self.txn_prefix)
    }

    async fn sync_once(&self, since: Option<&str>) -> Result<SyncResponse, TransportError> {
        let auth = self.authorized()?;
        let url = endpoint(&auth.base, &["sync"])?;
        let timeout_ms = self.config.sync_timeout.as_millis().to_string();

        let mut request = self.http.get(url).bearer_auth(&auth.access_token).query(&[("timeout", timeout_ms)]);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        execute(request).await
    }
}

impl fmt::Debug for MatrixTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.auth.read().unwrap_or_else(PoisonError::into_inner).as_ref().map(|a| a.base.to_string());
        f.debug_struct("MatrixTransport")
            .field("config", &self.config)
            .field("homeserver", &base)
            .finish_non_exhaustive()
    }
}

impl Transport for MatrixTransport {
    async fn login(&self, credentials: &Credentials) -> Result<LoginSession, TransportError> {
        let base = Url::parse(&credentials.homeserver)
            .map_err(|e| TransportError::Network(format!("invalid homeserver URL: {e}")))?;
        let url = endpoint(&base, &["login"])?;
        let request =
            self.http.post(url).json(&LoginRequest::password(&credentials.username, &credentials.password));

        let response: LoginResponse = execute(request).await.map_err(|e| match e {
            TransportError::Http { status: 403, message } => TransportError::Auth(message),
            other => other,
        })?;

        *self.auth.write().unwrap_or_else(PoisonError::into_inner) =
            Some(Authorized { base, access_token: response.access_token });
        Ok(LoginSession { user_id: response.user_id, device_id: response.device_id })
    }

    async fn joined_room_ids(&self) -> Result<Vec<RoomId>, TransportError> {
        let auth = self.authorized()?;
        let url = endpoint(&auth.base, &["joined_rooms"])?;

        let response: JoinedRoomsResponse = execute(self.http.get(url).bearer_auth(&auth.access_token)).await?;
        Ok(response.joined_rooms.into_iter().map(RoomId::new).collect())
    }

    async fn send_message(&self, room_id: &RoomId, body: &str) -> Result<String, TransportError> {
        let auth = self.authorized()?;
        let txn_id = self.next_txn_id();
        let url = endpoint(&auth.base, &["rooms", room_id.as_str(), "send", "m.room.message", &txn_id])?;
        let request = self.http.put(url).bearer_auth(&auth.access_token).json(&TextMessage { msgtype: "m.text", body });

        let response: SendResponse = execute(request).await?;
        Ok(response.event_id)
    }

    async fn sync(&self, since: Option<String>, syncer: &Syncer) -> Result<(), TransportError> {
        let mut since = since;
        let mut failures = 0u32;

        loop {
            match self.sync_once(since.as_deref()).await {
                Ok(response) => {
                    failures = 0;
                    let (next_batch, events) = response.into_events();
                    for (source, event) in &events {
                        syncer.dispatch(*source, event);
                    }
                    syncer.complete_batch(&next_batch);
                    tracing::trace!(events = events.len(), next_batch = %next_batch, "sync batch applied");
                    since = Some(next_batch);
                },
                Err(e) if e.is_transient() => {
                    failures += 1;
                    let Some(delay) = self.config.retry.delay_for(failures) else {
                        tracing::error!(error = %e, failures, "sync retry budget exhausted");
                        return Err(e);
                    };
                    tracing::warn!(error = %e, failures, delay_ms = delay.as_millis() as u64, "sync failed, retrying");
                    tokio::time::sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// `<base>/_matrix/client/v3/<segments>`, each segment percent-encoded.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| TransportError::Network(format!("homeserver URL cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(["_matrix", "client", "v3"])
        .extend(segments);
    Ok(url)
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TransportError> {
    let response = request.send().await.map_err(|e| TransportError::Network(e.to_string()))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| TransportError::Network(e.to_string()))?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(TransportError::Auth(ErrorBody::describe(&body)));
    }
    if !status.is_success() {
        return Err(TransportError::Http { status: status.as_u16(), message: ErrorBody::describe(&body) });
    }

    serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
}
