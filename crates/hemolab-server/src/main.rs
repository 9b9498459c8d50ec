//! Hemolab Server: brings the access-control store up to date.
//!
//! Loads settings, connects to SurrealDB, applies schema migrations,
//! provisions the first superadmin if none exists and reports the
//! approval backlog.

mod settings;

use anyhow::Context;
use hemolab_access::bootstrap::ensure_superadmin;
use hemolab_access::{ChangeRequestService, NotificationRelay};
use hemolab_core::models::role::Role;
use hemolab_core::repository::UserRepository;
use hemolab_db::DbManager;
use hemolab_db::repository::{
    SurrealChangeRequestRepository, SurrealNotificationRepository, SurrealUserRepository,
};
use tracing_subscriber::EnvFilter;

use crate::settings::ServerSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hemolab=info,info")),
        )
        .json()
        .init();

    tracing::info!("Starting Hemolab server...");

    let settings = ServerSettings::load().context("loading settings")?;

    let manager = DbManager::open(&settings.database)
        .await
        .context("opening SurrealDB")?;
    let db = manager.client().clone();

    let users = match settings.password_pepper.clone() {
        Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper),
        None => SurrealUserRepository::new(db.clone()),
    };

    match &settings.bootstrap {
        Some(bootstrap) => {
            ensure_superadmin(&users, &bootstrap.name, &bootstrap.email, &bootstrap.password)
                .await
                .context("bootstrapping superadmin")?;
        }
        None => {
            if users.find_by_role(Role::Superadmin).await?.is_empty() {
                tracing::warn!("No superadmin exists and no bootstrap account is configured");
            }
        }
    }

    let relay = NotificationRelay::new(SurrealNotificationRepository::new(db.clone()), &settings.access);
    let workflow = ChangeRequestService::new(
        users,
        SurrealChangeRequestRepository::new(db),
        relay,
        settings.access.clone(),
    );

    let admins = workflow.users().find_by_role(Role::Superadmin).await?;
    if let Some(admin) = admins.first() {
        let pending = workflow.fetch_pending(&admin.actor()).await?;
        let unread = workflow.relay().unread_count(admin.id).await?;
        tracing::info!(
            superadmins = admins.len(),
            pending_requests = pending.len(),
            unread_notifications = unread,
            "Access control ready"
        );
    }

    tracing::info!("Hemolab server stopped.");
    Ok(())
}
