//! Access-layer configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the workflow, relay and session services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Stored when a request is rejected without a reason.
    pub default_rejection_reason: String,
    /// Random bytes in a generated temporary password (default: 18).
    pub temporary_password_bytes: usize,
    /// Buffered change events per notification feed (default: 256).
    pub notification_feed_capacity: usize,
    /// Idle time before a session times out, in seconds
    /// (default: 1800 = 30 minutes).
    pub session_idle_timeout_secs: u64,
}

impl AccessConfig {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            default_rejection_reason: "The request was rejected by an administrator.".into(),
            temporary_password_bytes: 18,
            notification_feed_capacity: 256,
            session_idle_timeout_secs: 1800,
        }
    }
}
