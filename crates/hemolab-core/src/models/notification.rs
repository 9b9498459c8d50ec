//! Notification domain model.
//!
//! Notifications are one-way inbox messages. They are created by the
//! approval workflow and only ever mutated by their recipient marking
//! them read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HemolabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RequestSubmitted,
    RequestApproved,
    RequestRejected,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::RequestSubmitted => "request_submitted",
            NotificationKind::RequestApproved => "request_approved",
            NotificationKind::RequestRejected => "request_rejected",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = HemolabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request_submitted" => Ok(NotificationKind::RequestSubmitted),
            "request_approved" => Ok(NotificationKind::RequestApproved),
            "request_rejected" => Ok(NotificationKind::RequestRejected),
            other => Err(HemolabError::validation(format!(
                "unknown notification kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    /// Context echoing the triggering change request.
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub kind: NotificationKind,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}
