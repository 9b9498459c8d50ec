//! Integration tests for the notification relay and its live feed.

use std::time::Duration;

use hemolab_access::config::AccessConfig;
use hemolab_access::notifier::NotificationRelay;
use hemolab_core::models::notification::{CreateNotification, Notification, NotificationKind};
use hemolab_db::repository::SurrealNotificationRepository;
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tokio::sync::mpsc;
use tokio::time::timeout;
use uuid::Uuid;

async fn setup() -> NotificationRelay<SurrealNotificationRepository<Db>> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    hemolab_db::run_migrations(&db).await.unwrap();
    NotificationRelay::new(SurrealNotificationRepository::new(db), &AccessConfig::default())
}

fn approved(recipient_id: Uuid, title: &str) -> CreateNotification {
    CreateNotification {
        kind: NotificationKind::RequestApproved,
        recipient_id,
        title: title.into(),
        message: "Your request was approved".into(),
        metadata: json!({}),
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Vec<Notification>>) -> Vec<Notification> {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("feed update should arrive")
        .expect("feed should still be open")
}

#[tokio::test]
async fn notify_and_read_marking() {
    let relay = setup().await;
    let recipient = Uuid::new_v4();

    let first = relay.notify(approved(recipient, "one")).await.unwrap();
    relay.notify(approved(recipient, "two")).await.unwrap();
    assert_eq!(relay.unread_count(recipient).await.unwrap(), 2);

    let read = relay.mark_read(first.id).await.unwrap();
    assert!(read.read);
    let again = relay.mark_read(first.id).await.unwrap();
    assert_eq!(again.read_at, read.read_at);
    assert_eq!(relay.unread_count(recipient).await.unwrap(), 1);

    assert_eq!(relay.mark_all_read(recipient).await.unwrap(), 1);
    assert_eq!(relay.mark_all_read(recipient).await.unwrap(), 0);

    let inbox = relay.list_for_recipient(recipient).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().all(|n| n.read));
    assert_eq!(inbox[0].title, "two");
}

#[tokio::test]
async fn feed_reports_additions_and_read_changes() {
    let relay = setup().await;
    let recipient = Uuid::new_v4();
    relay.notify(approved(recipient, "existing")).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = relay.subscribe_for_recipient(recipient, move |list| {
        let _ = tx.send(list);
    });
    assert!(subscription.is_active());

    let initial = next(&mut rx).await;
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].title, "existing");

    let added = relay.notify(approved(recipient, "fresh")).await.unwrap();
    let update = next(&mut rx).await;
    assert_eq!(update.len(), 2);
    assert_eq!(update[0].id, added.id);

    relay.mark_read(added.id).await.unwrap();
    let update = next(&mut rx).await;
    assert!(update[0].read);
    assert!(!update[1].read);
}

#[tokio::test]
async fn feed_ignores_other_recipients() {
    let relay = setup().await;
    let recipient = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = relay.subscribe_for_recipient(recipient, move |list| {
        let _ = tx.send(list);
    });
    assert!(next(&mut rx).await.is_empty());

    relay.notify(approved(Uuid::new_v4(), "elsewhere")).await.unwrap();
    relay.notify(approved(recipient, "mine")).await.unwrap();

    // The first update after the initial load is the recipient's own.
    let update = next(&mut rx).await;
    assert_eq!(update.len(), 1);
    assert_eq!(update[0].title, "mine");
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_stops_the_feed() {
    let relay = setup().await;
    let recipient = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = relay.subscribe_for_recipient(recipient, move |list| {
        let _ = tx.send(list);
    });
    next(&mut rx).await;

    subscription.unsubscribe();
    subscription.unsubscribe();
    assert!(!subscription.is_active());

    relay.notify(approved(recipient, "after")).await.unwrap();

    // The feed task exits and drops its callback without delivering.
    let closed = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
async fn dropping_the_subscription_stops_the_feed() {
    let relay = setup().await;
    let recipient = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = relay.subscribe_for_recipient(recipient, move |list| {
        let _ = tx.send(list);
    });
    next(&mut rx).await;
    drop(subscription);

    relay.notify(approved(recipient, "after")).await.unwrap();
    let closed = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert!(closed.is_none());
}
