//! Integration tests for the Notification repository using in-memory
//! SurrealDB.

use hemolab_core::error::HemolabError;
use hemolab_core::models::notification::{CreateNotification, NotificationKind};
use hemolab_core::repository::NotificationRepository;
use hemolab_db::repository::SurrealNotificationRepository;
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealNotificationRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    hemolab_db::run_migrations(&db).await.unwrap();
    SurrealNotificationRepository::new(db)
}

fn submitted(recipient_id: Uuid, title: &str) -> CreateNotification {
    CreateNotification {
        kind: NotificationKind::RequestSubmitted,
        recipient_id,
        title: title.into(),
        message: "A maintainer submitted a request".into(),
        metadata: json!({ "request_id": Uuid::new_v4().to_string() }),
    }
}

#[tokio::test]
async fn create_starts_unread() {
    let repo = setup().await;
    let recipient = Uuid::new_v4();

    let created = repo.create(submitted(recipient, "New request")).await.unwrap();
    assert_eq!(created.kind, NotificationKind::RequestSubmitted);
    assert_eq!(created.recipient_id, recipient);
    assert!(!created.read);
    assert!(created.read_at.is_none());
    assert!(created.metadata.get("request_id").is_some());

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.title, "New request");
}

#[tokio::test]
async fn list_is_newest_first_and_scoped_to_recipient() {
    let repo = setup().await;
    let recipient = Uuid::new_v4();

    let older = repo.create(submitted(recipient, "first")).await.unwrap();
    let newer = repo.create(submitted(recipient, "second")).await.unwrap();
    repo.create(submitted(Uuid::new_v4(), "someone else")).await.unwrap();

    let inbox = repo.list_for_recipient(recipient).await.unwrap();
    let ids: Vec<_> = inbox.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);
}

#[tokio::test]
async fn mark_read_keeps_first_timestamp() {
    let repo = setup().await;
    let created = repo.create(submitted(Uuid::new_v4(), "x")).await.unwrap();

    let first = repo.mark_read(created.id).await.unwrap();
    assert!(first.read);
    let stamped = first.read_at.expect("read_at should be set");

    let second = repo.mark_read(created.id).await.unwrap();
    assert!(second.read);
    assert_eq!(second.read_at, Some(stamped));
}

#[tokio::test]
async fn mark_read_unknown_is_not_found() {
    let repo = setup().await;
    let err = repo.mark_read(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, HemolabError::NotFound { .. }));
}

#[tokio::test]
async fn mark_all_read_is_idempotent() {
    let repo = setup().await;
    let recipient = Uuid::new_v4();
    let other = Uuid::new_v4();

    for title in ["a", "b", "c"] {
        repo.create(submitted(recipient, title)).await.unwrap();
    }
    repo.create(submitted(other, "d")).await.unwrap();
    assert_eq!(repo.count_unread(recipient).await.unwrap(), 3);

    assert_eq!(repo.mark_all_read(recipient).await.unwrap(), 3);
    assert_eq!(repo.mark_all_read(recipient).await.unwrap(), 0);

    let inbox = repo.list_for_recipient(recipient).await.unwrap();
    assert!(inbox.iter().all(|n| n.read && n.read_at.is_some()));
    assert_eq!(repo.count_unread(recipient).await.unwrap(), 0);

    // Other recipients are untouched.
    assert_eq!(repo.count_unread(other).await.unwrap(), 1);
}
