//! Entry point for user changes: applies them directly or routes them
//! through a change request, depending on the actor's role.

use hemolab_core::error::HemolabResult;
use hemolab_core::models::change_request::{ChangeKind, ChangeRequest};
use hemolab_core::models::user::{Actor, User, UserPayload};
use hemolab_core::permission::{self, Action, Resource};
use hemolab_core::repository::{ChangeRequestRepository, NotificationRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

use crate::error::require;
use crate::workflow::{ChangeRequestService, SubmitChangeRequest};

/// A requested mutation of a user account.
#[derive(Debug, Clone)]
pub enum UserChange {
    Create(UserPayload),
    Update { user_id: Uuid, payload: UserPayload },
    Delete { user_id: Uuid },
}

impl UserChange {
    pub fn action(&self) -> Action {
        match self {
            UserChange::Create(_) => Action::Create,
            UserChange::Update { .. } => Action::Edit,
            UserChange::Delete { .. } => Action::Delete,
        }
    }

    fn kind(&self) -> ChangeKind {
        match self {
            UserChange::Create(_) => ChangeKind::Create,
            UserChange::Update { .. } => ChangeKind::Update,
            UserChange::Delete { .. } => ChangeKind::Delete,
        }
    }
}

/// What happened to a [`UserChange`].
#[derive(Debug, Clone)]
pub enum ChangeOutcome {
    /// Applied immediately. Carries the resulting user, `None` for deletes.
    Applied(Option<User>),
    /// Waiting for a superadmin.
    Submitted(ChangeRequest),
}

pub struct UserChangeGateway<U, R, N>
where
    U: UserRepository,
    R: ChangeRequestRepository,
    N: NotificationRepository,
{
    workflow: ChangeRequestService<U, R, N>,
}

impl<U, R, N> UserChangeGateway<U, R, N>
where
    U: UserRepository,
    R: ChangeRequestRepository,
    N: NotificationRepository + 'static,
{
    pub fn new(workflow: ChangeRequestService<U, R, N>) -> Self {
        Self { workflow }
    }

    pub fn workflow(&self) -> &ChangeRequestService<U, R, N> {
        &self.workflow
    }

    /// Apply `change` on behalf of `actor`.
    ///
    /// The actor must hold the matching `users` permission. Changes that
    /// need approval become change requests; for updates and deletes the
    /// target's current values are captured now, not at approval time.
    pub async fn apply(&self, actor: &Actor, change: UserChange) -> HemolabResult<ChangeOutcome> {
        let action = change.action();
        require(actor.role, Resource::Users, action)?;

        if permission::needs_approval(actor.role, Resource::Users, action) {
            let input = match change {
                UserChange::Create(payload) => SubmitChangeRequest::create(payload),
                UserChange::Update { user_id, payload } => {
                    let current = self.workflow.users().get_by_id(user_id).await?;
                    SubmitChangeRequest::update(user_id, payload, current.payload())
                }
                UserChange::Delete { user_id } => {
                    let current = self.workflow.users().get_by_id(user_id).await?;
                    SubmitChangeRequest::delete(user_id, current.payload())
                }
            };
            let request = self.workflow.submit(actor, input).await?;
            return Ok(ChangeOutcome::Submitted(request));
        }

        let kind = change.kind();
        let (target, payload) = match change {
            UserChange::Create(payload) => (None, payload),
            UserChange::Update { user_id, payload } => {
                if payload.role.is_some() {
                    require(actor.role, Resource::Users, Action::ChangePermissions)?;
                }
                (Some(user_id), payload)
            }
            UserChange::Delete { user_id } => (Some(user_id), UserPayload::default()),
        };

        let user = self.workflow.apply_change(kind, target, &payload).await?;
        info!(
            actor_id = %actor.id,
            kind = %kind,
            target_user_id = ?target.or(user.as_ref().map(|u| u.id)),
            "User change applied directly"
        );
        Ok(ChangeOutcome::Applied(user))
    }
}
