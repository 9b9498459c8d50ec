//! SurrealDB implementation of [`ChangeRequestRepository`].
//!
//! Resolution writes are conditional on `status = 'pending'`: an
//! `UPDATE ... WHERE` that matches nothing means another approver got
//! there first, and the caller receives `None`.

use chrono::{DateTime, Utc};
use hemolab_core::error::HemolabResult;
use hemolab_core::models::change_request::{
    ChangeKind, ChangeRequest, CreateChangeRequest, RequestStatus,
};
use hemolab_core::models::role::Role;
use hemolab_core::models::user::UserPayload;
use hemolab_core::repository::ChangeRequestRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_enum, parse_optional_uuid, parse_uuid};
use crate::error::DbError;

/// Fields shared by both row shapes.
#[derive(Debug, SurrealValue)]
struct ChangeRequestRow {
    kind: String,
    target_user_id: Option<String>,
    requested_by: String,
    requested_by_name: String,
    requested_by_role: String,
    payload: serde_json::Value,
    original_payload: Option<serde_json::Value>,
    status: String,
    created_at: DateTime<Utc>,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

#[derive(Debug, SurrealValue)]
struct ChangeRequestRowWithId {
    record_id: String,
    kind: String,
    target_user_id: Option<String>,
    requested_by: String,
    requested_by_name: String,
    requested_by_role: String,
    payload: serde_json::Value,
    original_payload: Option<serde_json::Value>,
    status: String,
    created_at: DateTime<Utc>,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<String>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
}

fn decode_payload(value: serde_json::Value) -> Result<UserPayload, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::Decode(format!("payload: {e}")))
}

fn encode_payload(payload: &UserPayload) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(payload).map_err(|e| DbError::Decode(format!("payload: {e}")))
}

impl ChangeRequestRow {
    fn into_request(self, id: Uuid) -> Result<ChangeRequest, DbError> {
        Ok(ChangeRequest {
            id,
            kind: parse_enum::<ChangeKind>(&self.kind)?,
            target_user_id: parse_optional_uuid(self.target_user_id.as_deref(), "target user id")?,
            requested_by: parse_uuid(&self.requested_by, "requester id")?,
            requested_by_name: self.requested_by_name,
            requested_by_role: parse_enum::<Role>(&self.requested_by_role)?,
            payload: decode_payload(self.payload)?,
            original_payload: self.original_payload.map(decode_payload).transpose()?,
            status: parse_enum::<RequestStatus>(&self.status)?,
            created_at: self.created_at,
            approved_by: parse_optional_uuid(self.approved_by.as_deref(), "approver id")?,
            approved_at: self.approved_at,
            rejected_by: parse_optional_uuid(self.rejected_by.as_deref(), "rejecter id")?,
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason,
        })
    }
}

impl ChangeRequestRowWithId {
    fn try_into_request(self) -> Result<ChangeRequest, DbError> {
        let id = parse_uuid(&self.record_id, "change request id")?;
        ChangeRequestRow {
            kind: self.kind,
            target_user_id: self.target_user_id,
            requested_by: self.requested_by,
            requested_by_name: self.requested_by_name,
            requested_by_role: self.requested_by_role,
            payload: self.payload,
            original_payload: self.original_payload,
            status: self.status,
            created_at: self.created_at,
            approved_by: self.approved_by,
            approved_at: self.approved_at,
            rejected_by: self.rejected_by,
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason,
        }
        .into_request(id)
    }
}

fn collect(rows: Vec<ChangeRequestRowWithId>) -> Result<Vec<ChangeRequest>, DbError> {
    rows.into_iter()
        .map(ChangeRequestRowWithId::try_into_request)
        .collect()
}

/// SurrealDB implementation of the ChangeRequest repository.
#[derive(Clone)]
pub struct SurrealChangeRequestRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealChangeRequestRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Run a conditional resolution update and map the (possibly
    /// empty) result.
    async fn resolve(
        &self,
        id: Uuid,
        statement: &'static str,
        bindings: Vec<(&'static str, String)>,
    ) -> HemolabResult<Option<ChangeRequest>> {
        let mut builder = self.db.query(statement).bind(("id", id.to_string()));
        for binding in bindings {
            builder = builder.bind(binding);
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ChangeRequestRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.into_request(id)?)),
            None => Ok(None),
        }
    }
}

impl<C: Connection> ChangeRequestRepository for SurrealChangeRequestRepository<C> {
    async fn create(&self, input: CreateChangeRequest) -> HemolabResult<ChangeRequest> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let payload = encode_payload(&input.payload)?;
        let original_payload = input
            .original_payload
            .as_ref()
            .map(encode_payload)
            .transpose()?;

        let result = self
            .db
            .query(
                "CREATE type::record('change_request', $id) SET \
                 kind = $kind, \
                 target_user_id = $target_user_id, \
                 requested_by = $requested_by, \
                 requested_by_name = $requested_by_name, \
                 requested_by_role = $requested_by_role, \
                 payload = $payload, \
                 original_payload = $original_payload, \
                 status = 'pending'",
            )
            .bind(("id", id_str.clone()))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("target_user_id", input.target_user_id.map(|u| u.to_string())))
            .bind(("requested_by", input.requested_by.to_string()))
            .bind(("requested_by_name", input.requested_by_name))
            .bind(("requested_by_role", input.requested_by_role.as_str().to_string()))
            .bind(("payload", payload))
            .bind(("original_payload", original_payload))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ChangeRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "change_request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HemolabResult<ChangeRequest> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('change_request', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChangeRequestRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "change_request".into(),
            id: id_str,
        })?;

        Ok(row.into_request(id)?)
    }

    async fn list(&self, status: Option<RequestStatus>) -> HemolabResult<Vec<ChangeRequest>> {
        let builder = match status {
            Some(status) => self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM change_request \
                     WHERE status = $status ORDER BY created_at DESC",
                )
                .bind(("status", status.as_str().to_string())),
            None => self.db.query(
                "SELECT meta::id(id) AS record_id, * FROM change_request \
                 ORDER BY created_at DESC",
            ),
        };

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ChangeRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(collect(rows)?)
    }

    async fn list_by_requester(&self, requested_by: Uuid) -> HemolabResult<Vec<ChangeRequest>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM change_request \
                 WHERE requested_by = $requested_by ORDER BY created_at DESC",
            )
            .bind(("requested_by", requested_by.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChangeRequestRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(collect(rows)?)
    }

    async fn mark_approved(
        &self,
        id: Uuid,
        approved_by: Uuid,
    ) -> HemolabResult<Option<ChangeRequest>> {
        self.resolve(
            id,
            "UPDATE type::record('change_request', $id) SET \
             status = 'approved', \
             approved_by = $approved_by, \
             approved_at = time::now() \
             WHERE status = 'pending'",
            vec![("approved_by", approved_by.to_string())],
        )
        .await
    }

    async fn mark_rejected(
        &self,
        id: Uuid,
        rejected_by: Uuid,
        reason: String,
    ) -> HemolabResult<Option<ChangeRequest>> {
        self.resolve(
            id,
            "UPDATE type::record('change_request', $id) SET \
             status = 'rejected', \
             rejected_by = $rejected_by, \
             rejected_at = time::now(), \
             rejection_reason = $reason \
             WHERE status = 'pending'",
            vec![
                ("rejected_by", rejected_by.to_string()),
                ("reason", reason),
            ],
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> HemolabResult<()> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("DELETE type::record('change_request', $id) RETURN BEFORE")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ChangeRequestRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "change_request".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }
}
