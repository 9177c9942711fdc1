//! Render notifier.
//!
//! Decouples "state changed" from "redraw". Producers call
//! [`RenderNotifier::notify`] from any thread without blocking; the single
//! redraw task awaits [`RenderNotifier::notified`]. Notifications that arrive
//! while nobody is waiting collapse into one stored permit, so a burst costs
//! one redraw and the last notification of a burst is never lost.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::Notify;

/// Coalescing redraw signal. Clone is cheap (Arc).
#[derive(Debug, Clone, Default)]
pub struct RenderNotifier {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    notify: Notify,
    generation: AtomicU64,
}

impl RenderNotifier {
    /// Create a notifier with no pending redraw.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a redraw. Never blocks.
    pub fn notify(&self) {
        self.inner.generation.fetch_add(1, Ordering::Release);
        self.inner.notify.notify_one();
    }

    /// Wait until a redraw has been requested since the last wait completed.
    ///
    /// Only one task should drain the notifier.
    pub async fn notified(&self) {
        self.inner.notify.notified().await;
    }

    /// Number of notifications ever requested.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }
}
