//! Idle tracking for a signed-in session.
//!
//! A [`SessionActivity`] is created at login and ended at logout. It
//! records the last user activity and fires a callback once if the
//! session sits idle for longer than the configured window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::config::AccessConfig;

#[derive(Debug)]
pub struct SessionActivity {
    user_id: Uuid,
    idle_timeout: Duration,
    last_activity: Arc<Mutex<Instant>>,
    /// Set exactly once, by whichever of timeout or `end` gets there first.
    closed: Arc<AtomicBool>,
    token: CancellationToken,
}

impl SessionActivity {
    /// [`start`](Self::start) with the configured idle window.
    pub fn from_config<F>(user_id: Uuid, config: &AccessConfig, on_timeout: F) -> Self
    where
        F: FnOnce(Uuid) + Send + 'static,
    {
        Self::start(user_id, config.session_idle_timeout(), on_timeout)
    }

    /// Begin tracking `user_id`'s session. Must be called inside a tokio
    /// runtime.
    ///
    /// `on_timeout` runs at most once, when the idle window lapses
    /// without a [`touch`](Self::touch). It never runs after
    /// [`end`](Self::end).
    pub fn start<F>(user_id: Uuid, idle_timeout: Duration, on_timeout: F) -> Self
    where
        F: FnOnce(Uuid) + Send + 'static,
    {
        let last_activity = Arc::new(Mutex::new(Instant::now()));
        let closed = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();

        let watched = Arc::clone(&last_activity);
        let timed_out = Arc::clone(&closed);
        let cancel = token.clone();
        tokio::spawn(async move {
            loop {
                let deadline = *watched.lock().unwrap_or_else(PoisonError::into_inner) + idle_timeout;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = sleep_until(deadline) => {}
                }

                // Activity may have moved the deadline while we slept.
                let last = *watched.lock().unwrap_or_else(PoisonError::into_inner);
                if Instant::now() < last + idle_timeout {
                    continue;
                }
                if !timed_out.swap(true, Ordering::AcqRel) {
                    cancel.cancel();
                    info!(user_id = %user_id, "Session timed out");
                    on_timeout(user_id);
                }
                return;
            }
        });

        info!(user_id = %user_id, idle_secs = idle_timeout.as_secs(), "Session started");
        Self {
            user_id,
            idle_timeout,
            last_activity,
            closed,
            token,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Record user activity, pushing the timeout back. Has no effect once
    /// the session has ended or timed out.
    pub fn touch(&self) {
        if self.is_active() {
            *self.lock() = Instant::now();
        }
    }

    /// Idle time left before the session times out.
    pub fn remaining(&self) -> Duration {
        if !self.is_active() {
            return Duration::ZERO;
        }
        (*self.lock() + self.idle_timeout).saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// False after [`end`](Self::end) or a timeout.
    pub fn is_active(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Stop tracking. Idempotent.
    ///
    /// Returns `false` if the session had already ended or timed out, in
    /// which case nothing changes.
    pub fn end(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        info!(user_id = %self.user_id, "Session ended");
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionActivity {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.token.cancel();
    }
}
