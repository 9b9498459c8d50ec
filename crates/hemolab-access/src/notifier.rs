//! Notification relay: persists inbox messages and feeds live views.
//!
//! Every write goes through the repository first; only after it
//! succeeds is the recipient's id published on an in-process broadcast
//! channel. Feed tasks listen on that channel and reload the full
//! newest-first list for their recipient whenever it changes.

use std::sync::Arc;

use hemolab_core::error::HemolabResult;
use hemolab_core::models::notification::{CreateNotification, Notification};
use hemolab_core::repository::NotificationRepository;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AccessConfig;

/// Persists notifications and publishes per-recipient change events.
pub struct NotificationRelay<N: NotificationRepository> {
    repo: Arc<N>,
    events: broadcast::Sender<Uuid>,
}

impl<N: NotificationRepository> Clone for NotificationRelay<N> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            events: self.events.clone(),
        }
    }
}

impl<N: NotificationRepository + 'static> NotificationRelay<N> {
    pub fn new(repo: N, config: &AccessConfig) -> Self {
        let (events, _) = broadcast::channel(config.notification_feed_capacity.max(1));
        Self {
            repo: Arc::new(repo),
            events,
        }
    }

    /// Persist a notification. It shows up in the recipient's inbox on
    /// the next read, and immediately in any live feed.
    pub async fn notify(&self, input: CreateNotification) -> HemolabResult<Notification> {
        let notification = self.repo.create(input).await?;
        info!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            kind = %notification.kind,
            "Notification stored"
        );
        self.publish(notification.recipient_id);
        Ok(notification)
    }

    /// Mark one notification read. Repeated calls are harmless.
    pub async fn mark_read(&self, notification_id: Uuid) -> HemolabResult<Notification> {
        let notification = self.repo.mark_read(notification_id).await?;
        self.publish(notification.recipient_id);
        Ok(notification)
    }

    /// Mark all of a recipient's notifications read and return how many
    /// were unread.
    pub async fn mark_all_read(&self, recipient_id: Uuid) -> HemolabResult<u64> {
        let changed = self.repo.mark_all_read(recipient_id).await?;
        if changed > 0 {
            self.publish(recipient_id);
        }
        Ok(changed)
    }

    pub async fn list_for_recipient(&self, recipient_id: Uuid) -> HemolabResult<Vec<Notification>> {
        self.repo.list_for_recipient(recipient_id).await
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> HemolabResult<u64> {
        self.repo.count_unread(recipient_id).await
    }

    /// Open a live feed of `recipient_id`'s notifications.
    ///
    /// `on_change` receives the full newest-first list once when the feed
    /// starts and again after every addition or read-state change. The
    /// feed runs until the returned [`Subscription`] is unsubscribed or
    /// dropped.
    pub fn subscribe_for_recipient<F>(&self, recipient_id: Uuid, on_change: F) -> Subscription
    where
        F: FnMut(Vec<Notification>) + Send + 'static,
    {
        let token = CancellationToken::new();
        let feed = Feed {
            repo: Arc::clone(&self.repo),
            recipient_id,
            cancel: token.clone(),
            on_change,
        };
        // Subscribe before the task starts so no event between the
        // initial load and the first recv is lost.
        let events = self.events.subscribe();
        tokio::spawn(feed.run(events));

        debug!(recipient_id = %recipient_id, "Notification feed opened");
        Subscription { token }
    }

    fn publish(&self, recipient_id: Uuid) {
        // No receivers just means nobody is watching.
        let _ = self.events.send(recipient_id);
    }
}

struct Feed<N, F> {
    repo: Arc<N>,
    recipient_id: Uuid,
    cancel: CancellationToken,
    on_change: F,
}

impl<N, F> Feed<N, F>
where
    N: NotificationRepository,
    F: FnMut(Vec<Notification>) + Send + 'static,
{
    async fn run(mut self, mut events: broadcast::Receiver<Uuid>) {
        self.deliver().await;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(recipient_id) if recipient_id == self.recipient_id => self.deliver().await,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            recipient_id = %self.recipient_id,
                            skipped,
                            "Notification feed lagged, reloading"
                        );
                        self.deliver().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        debug!(recipient_id = %self.recipient_id, "Notification feed closed");
    }

    async fn deliver(&mut self) {
        match self.repo.list_for_recipient(self.recipient_id).await {
            Ok(list) => {
                if !self.cancel.is_cancelled() {
                    (self.on_change)(list);
                }
            }
            Err(e) => warn!(
                recipient_id = %self.recipient_id,
                error = %e,
                "Failed to load notification feed"
            ),
        }
    }
}

/// Handle to a live notification feed.
///
/// Unsubscribing is idempotent, and dropping the handle unsubscribes.
#[must_use = "dropping a Subscription closes the feed"]
#[derive(Debug)]
pub struct Subscription {
    token: CancellationToken,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
