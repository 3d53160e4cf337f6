//! Stop coordination between the host and the replay engine.
//!
//! A [`StopHandle`] is created by the host, handed to the engine, and
//! triggered from anywhere (typically a Ctrl+C task). The engine observes it
//! at its yield points; a pending wait is cut short, an in-flight row update
//! is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared handle to a stop signal.
pub type SharedStop = Arc<StopHandle>;

/// Cooperative stop signal for a replay run.
#[derive(Debug, Default)]
pub struct StopHandle {
    stop_requested: AtomicBool,
    notify: Notify,
}

impl StopHandle {
    /// Create a new, unsignalled handle.
    pub fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Create a new shared handle wrapped in [`Arc`].
    pub fn shared() -> SharedStop {
        Arc::new(Self::new())
    }

    /// Request a stop. Idempotent and non-blocking; waiters are woken once.
    pub fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Wait until a stop is requested. Returns immediately if already set.
    pub async fn wait_for_stop(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent request is not missed
        notified.as_mut().enable();
        if self.is_stop_requested() {
            return;
        }
        notified.await;
    }
}
