//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The service layer is generic
//! over these traits so it carries no dependency on a storage engine.

use uuid::Uuid;

use crate::error::HemolabResult;
use crate::models::{
    change_request::{ChangeRequest, CreateChangeRequest, RequestStatus},
    notification::{CreateNotification, Notification},
    role::Role,
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = HemolabResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HemolabResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = HemolabResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = HemolabResult<User>> + Send;
    /// Permanently remove a user. Fails with `NotFound` if absent.
    fn delete(&self, id: Uuid) -> impl Future<Output = HemolabResult<()>> + Send;
    /// All accounts holding `role`, oldest first.
    fn find_by_role(&self, role: Role) -> impl Future<Output = HemolabResult<Vec<User>>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HemolabResult<PaginatedResult<User>>> + Send;
}

// ---------------------------------------------------------------------------
// Change requests
// ---------------------------------------------------------------------------

pub trait ChangeRequestRepository: Send + Sync {
    /// Persist a new request in `pending` status.
    fn create(
        &self,
        input: CreateChangeRequest,
    ) -> impl Future<Output = HemolabResult<ChangeRequest>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HemolabResult<ChangeRequest>> + Send;
    /// Requests newest first, optionally restricted to one status.
    fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> impl Future<Output = HemolabResult<Vec<ChangeRequest>>> + Send;
    /// Requests submitted by `requested_by`, newest first.
    fn list_by_requester(
        &self,
        requested_by: Uuid,
    ) -> impl Future<Output = HemolabResult<Vec<ChangeRequest>>> + Send;
    /// Conditionally move a pending request to `approved`.
    ///
    /// Returns `None` when the request is no longer pending, so at most
    /// one resolution ever commits.
    fn mark_approved(
        &self,
        id: Uuid,
        approved_by: Uuid,
    ) -> impl Future<Output = HemolabResult<Option<ChangeRequest>>> + Send;
    /// Conditionally move a pending request to `rejected`.
    ///
    /// Returns `None` when the request is no longer pending.
    fn mark_rejected(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        reason: String,
    ) -> impl Future<Output = HemolabResult<Option<ChangeRequest>>> + Send;
    /// Administrative removal, regardless of status.
    fn delete(&self, id: Uuid) -> impl Future<Output = HemolabResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub trait NotificationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateNotification,
    ) -> impl Future<Output = HemolabResult<Notification>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HemolabResult<Notification>> + Send;
    /// The recipient's notifications, newest first.
    fn list_for_recipient(
        &self,
        recipient_id: Uuid,
    ) -> impl Future<Output = HemolabResult<Vec<Notification>>> + Send;
    /// Mark one notification read. Already-read notifications keep
    /// their original `read_at`.
    fn mark_read(&self, id: Uuid) -> impl Future<Output = HemolabResult<Notification>> + Send;
    /// Mark every unread notification of the recipient read and return
    /// how many changed.
    fn mark_all_read(
        &self,
        recipient_id: Uuid,
    ) -> impl Future<Output = HemolabResult<u64>> + Send;
    fn count_unread(&self, recipient_id: Uuid) -> impl Future<Output = HemolabResult<u64>> + Send;
}
