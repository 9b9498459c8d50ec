//! SurrealDB implementation of [`NotificationRepository`].

use chrono::{DateTime, Utc};
use hemolab_core::error::HemolabResult;
use hemolab_core::models::notification::{CreateNotification, Notification, NotificationKind};
use hemolab_core::repository::NotificationRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_enum, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct NotificationRow {
    kind: String,
    recipient_id: String,
    title: String,
    message: String,
    read: bool,
    read_at: Option<DateTime<Utc>>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct NotificationRowWithId {
    record_id: String,
    kind: String,
    recipient_id: String,
    title: String,
    message: String,
    read: bool,
    read_at: Option<DateTime<Utc>>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self, id: Uuid) -> Result<Notification, DbError> {
        Ok(Notification {
            id,
            kind: parse_enum::<NotificationKind>(&self.kind)?,
            recipient_id: parse_uuid(&self.recipient_id, "recipient id")?,
            title: self.title,
            message: self.message,
            read: self.read,
            created_at: self.created_at,
            read_at: self.read_at,
            metadata: self.metadata,
        })
    }
}

impl NotificationRowWithId {
    fn try_into_notification(self) -> Result<Notification, DbError> {
        let id = parse_uuid(&self.record_id, "notification id")?;
        NotificationRow {
            kind: self.kind,
            recipient_id: self.recipient_id,
            title: self.title,
            message: self.message,
            read: self.read,
            read_at: self.read_at,
            metadata: self.metadata,
            created_at: self.created_at,
        }
        .into_notification(id)
    }
}

/// SurrealDB implementation of the Notification repository.
#[derive(Clone)]
pub struct SurrealNotificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealNotificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> NotificationRepository for SurrealNotificationRepository<C> {
    async fn create(&self, input: CreateNotification) -> HemolabResult<Notification> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let metadata = if input.metadata.is_object() {
            input.metadata
        } else {
            serde_json::Value::Object(Default::default())
        };

        let result = self
            .db
            .query(
                "CREATE type::record('notification', $id) SET \
                 kind = $kind, \
                 recipient_id = $recipient_id, \
                 title = $title, \
                 message = $message, \
                 read = false, \
                 read_at = NONE, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("kind", input.kind.as_str().to_string()))
            .bind(("recipient_id", input.recipient_id.to_string()))
            .bind(("title", input.title))
            .bind(("message", input.message))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<NotificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "notification".into(),
            id: id_str,
        })?;

        Ok(row.into_notification(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HemolabResult<Notification> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('notification', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NotificationRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "notification".into(),
            id: id_str,
        })?;

        Ok(row.into_notification(id)?)
    }

    async fn list_for_recipient(&self, recipient_id: Uuid) -> HemolabResult<Vec<Notification>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM notification \
                 WHERE recipient_id = $recipient_id \
                 ORDER BY created_at DESC",
            )
            .bind(("recipient_id", recipient_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NotificationRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(NotificationRowWithId::try_into_notification)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(items)
    }

    async fn mark_read(&self, id: Uuid) -> HemolabResult<Notification> {
        // Only the first read stamps `read_at`; repeats are no-ops.
        self.db
            .query(
                "UPDATE type::record('notification', $id) SET \
                 read = true, read_at = time::now() \
                 WHERE read = false",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> HemolabResult<u64> {
        let recipient = recipient_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM notification \
                 WHERE recipient_id = $recipient_id AND read = false \
                 GROUP ALL",
            )
            .bind(("recipient_id", recipient.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        if total > 0 {
            self.db
                .query(
                    "UPDATE notification SET read = true, read_at = time::now() \
                     WHERE recipient_id = $recipient_id AND read = false",
                )
                .bind(("recipient_id", recipient))
                .await
                .map_err(DbError::from)?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;
        }

        Ok(total)
    }

    async fn count_unread(&self, recipient_id: Uuid) -> HemolabResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM notification \
                 WHERE recipient_id = $recipient_id AND read = false \
                 GROUP ALL",
            )
            .bind(("recipient_id", recipient_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}
