//! First-run provisioning.

use hemolab_core::error::HemolabResult;
use hemolab_core::models::role::Role;
use hemolab_core::models::user::{CreateUser, User};
use hemolab_core::repository::UserRepository;
use tracing::info;

/// Create a superadmin account unless one already exists.
///
/// Returns the new account, or `None` when the store already has a
/// superadmin. The given password must be changed on first login.
pub async fn ensure_superadmin<U: UserRepository>(
    users: &U,
    name: &str,
    email: &str,
    password: &str,
) -> HemolabResult<Option<User>> {
    if !users.find_by_role(Role::Superadmin).await?.is_empty() {
        return Ok(None);
    }

    let user = users
        .create(CreateUser {
            name: name.into(),
            email: email.into(),
            role: Role::Superadmin,
            password: password.into(),
            password_reset_required: true,
        })
        .await?;

    info!(user_id = %user.id, "Bootstrapped initial superadmin");
    Ok(Some(user))
}
