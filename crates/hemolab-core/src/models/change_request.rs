//! Change request domain model.
//!
//! A change request is a proposed create/update/delete of a user,
//! submitted by a maintainer and resolved exactly once by a superadmin.
//! `Pending` is the only non-terminal status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HemolabError, HemolabResult};
use crate::models::role::Role;
use crate::models::user::UserPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = HemolabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(ChangeKind::Create),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            other => Err(HemolabError::validation(format!(
                "unknown change kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// The only legal transitions are `pending → approved` and
    /// `pending → rejected`.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == RequestStatus::Pending && next.is_terminal()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = HemolabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(HemolabError::validation(format!(
                "unknown request status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: Uuid,
    pub kind: ChangeKind,
    /// `None` only for [`ChangeKind::Create`].
    pub target_user_id: Option<Uuid>,
    pub requested_by: Uuid,
    pub requested_by_name: String,
    pub requested_by_role: Role,
    pub payload: UserPayload,
    /// Values at submission time; present only for updates.
    pub original_payload: Option<UserPayload>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl ChangeRequest {
    /// Fail with `InvalidState` unless the request may move to `next`.
    pub fn ensure_can_transition(&self, next: RequestStatus) -> HemolabResult<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(HemolabError::InvalidState {
                entity: "change_request".into(),
                id: self.id.to_string(),
                status: self.status.to_string(),
            })
        }
    }

    /// Identifier of who resolved the request, if anyone has.
    pub fn resolved_by(&self) -> Option<Uuid> {
        self.approved_by.or(self.rejected_by)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChangeRequest {
    pub kind: ChangeKind,
    pub target_user_id: Option<Uuid>,
    pub requested_by: Uuid,
    pub requested_by_name: String,
    pub requested_by_role: Role,
    pub payload: UserPayload,
    pub original_payload: Option<UserPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Approved, Rejected] {
            for next in [Pending, Approved, Rejected] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn resolved_request_is_not_pending() {
        let request = ChangeRequest {
            id: Uuid::new_v4(),
            kind: ChangeKind::Delete,
            target_user_id: Some(Uuid::new_v4()),
            requested_by: Uuid::new_v4(),
            requested_by_name: "Maya".into(),
            requested_by_role: Role::Maintainer,
            payload: UserPayload::default(),
            original_payload: None,
            status: RequestStatus::Rejected,
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            rejected_by: Some(Uuid::new_v4()),
            rejected_at: Some(Utc::now()),
            rejection_reason: Some("no".into()),
        };

        for next in [RequestStatus::Approved, RequestStatus::Rejected] {
            let err = request.ensure_can_transition(next).unwrap_err();
            assert!(err.is_conflict());
        }
        assert_eq!(request.resolved_by(), request.rejected_by);
    }
}
