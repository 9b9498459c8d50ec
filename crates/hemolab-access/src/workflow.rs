//! Change-request workflow: maintainers propose user changes,
//! superadmins resolve them.
//!
//! Resolution applies the user mutation first and only then moves the
//! request out of `pending`, using a conditional write so at most one
//! resolution ever commits. Notifications are best effort: failures are
//! logged and never fail the operation they belong to.

use hemolab_core::error::{HemolabError, HemolabResult};
use hemolab_core::models::change_request::{
    ChangeKind, ChangeRequest, CreateChangeRequest, RequestStatus,
};
use hemolab_core::models::notification::{CreateNotification, NotificationKind};
use hemolab_core::models::role::Role;
use hemolab_core::models::user::{Actor, UpdateUser, User, UserPayload};
use hemolab_core::permission::{Action, Resource};
use hemolab_core::repository::{ChangeRequestRepository, NotificationRepository, UserRepository};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;
use crate::credential::generate_temporary_password;
use crate::error::{AccessError, require, require_role};
use crate::notifier::NotificationRelay;

/// A proposed user change as submitted by a maintainer.
#[derive(Debug, Clone)]
pub struct SubmitChangeRequest {
    pub kind: ChangeKind,
    pub target_user_id: Option<Uuid>,
    pub payload: UserPayload,
    /// Current values of the target, captured at submission time.
    pub original_payload: Option<UserPayload>,
}

impl SubmitChangeRequest {
    pub fn create(payload: UserPayload) -> Self {
        Self {
            kind: ChangeKind::Create,
            target_user_id: None,
            payload,
            original_payload: None,
        }
    }

    pub fn update(target_user_id: Uuid, payload: UserPayload, original: UserPayload) -> Self {
        Self {
            kind: ChangeKind::Update,
            target_user_id: Some(target_user_id),
            payload,
            original_payload: Some(original),
        }
    }

    /// `snapshot` describes the user being removed, for display.
    pub fn delete(target_user_id: Uuid, snapshot: UserPayload) -> Self {
        Self {
            kind: ChangeKind::Delete,
            target_user_id: Some(target_user_id),
            payload: snapshot,
            original_payload: None,
        }
    }

    fn validate(&self) -> Result<(), AccessError> {
        match self.kind {
            ChangeKind::Create => {
                if self.target_user_id.is_some() {
                    return Err(AccessError::InvalidRequest(
                        "create requests cannot target an existing user".into(),
                    ));
                }
                for (field, present) in [
                    ("name", self.payload.name.is_some()),
                    ("email", self.payload.email.is_some()),
                    ("role", self.payload.role.is_some()),
                ] {
                    if !present {
                        return Err(AccessError::InvalidRequest(format!(
                            "create payload is missing `{field}`"
                        )));
                    }
                }
            }
            ChangeKind::Update => {
                if self.target_user_id.is_none() {
                    return Err(AccessError::InvalidRequest(
                        "update requests need a target user".into(),
                    ));
                }
                if self.payload.is_empty() {
                    return Err(AccessError::InvalidRequest(
                        "update payload proposes no changes".into(),
                    ));
                }
                if self.original_payload.is_none() {
                    return Err(AccessError::InvalidRequest(
                        "update requests must carry the original values".into(),
                    ));
                }
            }
            ChangeKind::Delete => {
                if self.target_user_id.is_none() {
                    return Err(AccessError::InvalidRequest(
                        "delete requests need a target user".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Change-request service.
///
/// Generic over repository implementations so that the workflow has no
/// dependency on the database crate.
pub struct ChangeRequestService<U, R, N>
where
    U: UserRepository,
    R: ChangeRequestRepository,
    N: NotificationRepository,
{
    users: U,
    requests: R,
    relay: NotificationRelay<N>,
    config: AccessConfig,
}

impl<U, R, N> ChangeRequestService<U, R, N>
where
    U: UserRepository,
    R: ChangeRequestRepository,
    N: NotificationRepository + 'static,
{
    pub fn new(users: U, requests: R, relay: NotificationRelay<N>, config: AccessConfig) -> Self {
        Self {
            users,
            requests,
            relay,
            config,
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn relay(&self) -> &NotificationRelay<N> {
        &self.relay
    }

    /// Record a maintainer's proposed user change and tell a superadmin.
    pub async fn submit(
        &self,
        actor: &Actor,
        input: SubmitChangeRequest,
    ) -> HemolabResult<ChangeRequest> {
        require_role(actor.role, Role::Maintainer, "submitting a change request")?;
        input.validate()?;

        let request = self
            .requests
            .create(CreateChangeRequest {
                kind: input.kind,
                target_user_id: input.target_user_id,
                requested_by: actor.id,
                requested_by_name: actor.name.clone(),
                requested_by_role: actor.role,
                payload: input.payload,
                original_payload: input.original_payload,
            })
            .await?;

        info!(
            request_id = %request.id,
            kind = %request.kind,
            requested_by = %actor.id,
            "Change request submitted"
        );

        self.notify_approver(&request).await;
        Ok(request)
    }

    /// Apply a pending request's change and mark it approved.
    ///
    /// If the user mutation fails the request stays pending and the
    /// error is returned.
    pub async fn approve(&self, request_id: Uuid, approver: &Actor) -> HemolabResult<ChangeRequest> {
        require_role(approver.role, Role::Superadmin, "approving a change request")?;

        let request = self.requests.get_by_id(request_id).await?;
        request.ensure_can_transition(RequestStatus::Approved)?;

        self.apply_change(request.kind, request.target_user_id, &request.payload)
            .await?;

        let approved = match self.requests.mark_approved(request_id, approver.id).await? {
            Some(approved) => approved,
            None => return Err(self.resolved_elsewhere(request_id, true).await),
        };

        info!(
            request_id = %approved.id,
            kind = %approved.kind,
            approved_by = %approver.id,
            "Change request approved"
        );

        let subject = describe(&approved);
        self.deliver(CreateNotification {
            kind: NotificationKind::RequestApproved,
            recipient_id: approved.requested_by,
            title: "Change request approved".into(),
            message: format!(
                "Your request to {} {subject} was approved by {}.",
                approved.kind, approver.name
            ),
            metadata: metadata(&approved, None),
        })
        .await;

        Ok(approved)
    }

    /// Mark a pending request rejected.
    ///
    /// A missing or blank `reason` is replaced by the configured default;
    /// anything else is stored as given.
    pub async fn reject(
        &self,
        request_id: Uuid,
        approver: &Actor,
        reason: Option<&str>,
    ) -> HemolabResult<ChangeRequest> {
        require_role(approver.role, Role::Superadmin, "rejecting a change request")?;

        let request = self.requests.get_by_id(request_id).await?;
        request.ensure_can_transition(RequestStatus::Rejected)?;

        let reason = match reason {
            Some(reason) if !reason.trim().is_empty() => reason.to_string(),
            _ => self.config.default_rejection_reason.clone(),
        };

        let rejected = match self
            .requests
            .mark_rejected(request_id, approver.id, reason.clone())
            .await?
        {
            Some(rejected) => rejected,
            None => return Err(self.resolved_elsewhere(request_id, false).await),
        };

        info!(
            request_id = %rejected.id,
            kind = %rejected.kind,
            rejected_by = %approver.id,
            "Change request rejected"
        );

        let subject = describe(&rejected);
        self.deliver(CreateNotification {
            kind: NotificationKind::RequestRejected,
            recipient_id: rejected.requested_by,
            title: "Change request rejected".into(),
            message: format!(
                "Your request to {} {subject} was rejected by {}: {reason}",
                rejected.kind, approver.name
            ),
            metadata: metadata(&rejected, Some(&reason)),
        })
        .await;

        Ok(rejected)
    }

    /// Every request, newest first.
    pub async fn fetch_all(&self, viewer: &Actor) -> HemolabResult<Vec<ChangeRequest>> {
        require(viewer.role, Resource::Approvals, Action::View)?;
        self.requests.list(None).await
    }

    /// Requests still awaiting resolution, newest first.
    pub async fn fetch_pending(&self, viewer: &Actor) -> HemolabResult<Vec<ChangeRequest>> {
        require(viewer.role, Resource::Approvals, Action::View)?;
        self.requests.list(Some(RequestStatus::Pending)).await
    }

    /// Requests the actor submitted, newest first.
    pub async fn fetch_own(&self, actor: &Actor) -> HemolabResult<Vec<ChangeRequest>> {
        self.requests.list_by_requester(actor.id).await
    }

    /// A single request, visible to approval viewers and its submitter.
    ///
    /// Viewers without `approvals:view` get `PermissionDenied` for any id
    /// they did not submit, whether or not it exists.
    pub async fn get(&self, viewer: &Actor, request_id: Uuid) -> HemolabResult<ChangeRequest> {
        let denied = match require(viewer.role, Resource::Approvals, Action::View) {
            Ok(()) => return self.requests.get_by_id(request_id).await,
            Err(denied) => denied,
        };

        match self.requests.get_by_id(request_id).await {
            Ok(request) if request.requested_by == viewer.id => Ok(request),
            Ok(_) | Err(HemolabError::NotFound { .. }) => Err(denied.into()),
            Err(e) => Err(e),
        }
    }

    /// Administrative cleanup; allowed in any status.
    pub async fn delete(&self, actor: &Actor, request_id: Uuid) -> HemolabResult<()> {
        require_role(actor.role, Role::Superadmin, "deleting a change request")?;
        self.requests.delete(request_id).await?;
        info!(request_id = %request_id, deleted_by = %actor.id, "Change request deleted");
        Ok(())
    }

    /// Run a user mutation against the user store.
    ///
    /// Created accounts get a generated password and must reset it on
    /// first login. Returns the resulting user, or `None` for deletes.
    pub(crate) async fn apply_change(
        &self,
        kind: ChangeKind,
        target_user_id: Option<Uuid>,
        payload: &UserPayload,
    ) -> HemolabResult<Option<User>> {
        let target = || {
            target_user_id.ok_or_else(|| {
                HemolabError::from(AccessError::InvalidRequest(format!(
                    "{kind} change has no target user"
                )))
            })
        };

        match kind {
            ChangeKind::Create => {
                let password = generate_temporary_password(self.config.temporary_password_bytes);
                let user = self
                    .users
                    .create(payload.clone().into_create_user(password)?)
                    .await?;
                Ok(Some(user))
            }
            ChangeKind::Update => {
                let update = UpdateUser::from(payload.clone());
                if update.is_empty() {
                    return Err(AccessError::InvalidRequest("update proposes no changes".into()).into());
                }
                Ok(Some(self.users.update(target()?, update).await?))
            }
            ChangeKind::Delete => {
                self.users.delete(target()?).await?;
                Ok(None)
            }
        }
    }

    /// Build the error for a conditional transition that matched
    /// nothing because another resolution committed first.
    async fn resolved_elsewhere(&self, request_id: Uuid, mutation_applied: bool) -> HemolabError {
        let current = match self.requests.get_by_id(request_id).await {
            Ok(current) => current,
            Err(e) => return e,
        };

        let resolved_by = current.resolved_by().map(|id| id.to_string());
        if mutation_applied {
            warn!(
                request_id = %request_id,
                status = %current.status,
                resolved_by = ?resolved_by,
                "Change applied but request was resolved concurrently"
            );
        } else {
            warn!(
                request_id = %request_id,
                status = %current.status,
                resolved_by = ?resolved_by,
                "Request was resolved concurrently"
            );
        }

        AccessError::AlreadyResolved {
            id: request_id.to_string(),
            status: current.status.to_string(),
        }
        .into()
    }

    /// Tell a superadmin about a new request. The oldest superadmin
    /// account is the consistent choice; with none the step is skipped.
    async fn notify_approver(&self, request: &ChangeRequest) {
        let approver = match self.users.find_by_role(Role::Superadmin).await {
            Ok(admins) => admins.into_iter().next(),
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "Could not look up a superadmin");
                return;
            }
        };

        let Some(approver) = approver else {
            warn!(request_id = %request.id, "No superadmin to notify");
            return;
        };

        self.deliver(CreateNotification {
            kind: NotificationKind::RequestSubmitted,
            recipient_id: approver.id,
            title: "New user change request".into(),
            message: format!(
                "{} ({}) requested to {} {}.",
                request.requested_by_name,
                request.requested_by_role.label(),
                request.kind,
                describe(request)
            ),
            metadata: metadata(request, None),
        })
        .await;
    }

    async fn deliver(&self, notification: CreateNotification) {
        let recipient_id = notification.recipient_id;
        let kind = notification.kind;
        if let Err(e) = self.relay.notify(notification).await {
            let e = HemolabError::Notification(e.to_string());
            warn!(recipient_id = %recipient_id, kind = %kind, error = %e, "Notification dropped");
        }
    }
}

fn describe(request: &ChangeRequest) -> String {
    let subject = request
        .payload
        .subject()
        .or_else(|| request.original_payload.as_ref().and_then(UserPayload::subject));
    match subject {
        Some(subject) => format!("user {subject}"),
        None => "a user".into(),
    }
}

fn metadata(request: &ChangeRequest, reason: Option<&str>) -> serde_json::Value {
    let mut metadata = json!({
        "request_id": request.id.to_string(),
        "request_kind": request.kind.as_str(),
        "target_user_id": request.target_user_id.map(|id| id.to_string()),
    });
    if let Some(reason) = reason {
        metadata["reason"] = json!(reason);
    }
    metadata
}
