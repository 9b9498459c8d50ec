//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HemolabError, HemolabResult};
use crate::models::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    /// Set for accounts created with a generated credential.
    pub password_reset_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The acting identity of this user for workflow calls.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            name: self.name.clone(),
            role: self.role,
        }
    }

    /// Snapshot of the fields a change request may propose.
    pub fn payload(&self) -> UserPayload {
        UserPayload {
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            role: Some(self.role),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Raw password (hashed with Argon2id before storage).
    pub password: String,
    pub password_reset_required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_reset_required: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
            && self.password_reset_required.is_none()
    }
}

/// Proposed user field values carried by a change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UserPayload {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }

    /// Short description of the subject for notification text.
    pub fn subject(&self) -> Option<&str> {
        self.name.as_deref().or(self.email.as_deref())
    }

    /// Build a [`CreateUser`] from a complete payload.
    ///
    /// Fails with a validation error when any field is missing.
    pub fn into_create_user(self, password: String) -> HemolabResult<CreateUser> {
        let missing = |field: &str| HemolabError::validation(format!("payload is missing `{field}`"));
        Ok(CreateUser {
            name: self.name.ok_or_else(|| missing("name"))?,
            email: self.email.ok_or_else(|| missing("email"))?,
            role: self.role.ok_or_else(|| missing("role"))?,
            password,
            password_reset_required: true,
        })
    }
}

impl From<UserPayload> for UpdateUser {
    fn from(payload: UserPayload) -> Self {
        Self {
            name: payload.name,
            email: payload.email,
            role: payload.role,
            password_reset_required: None,
        }
    }
}

/// The authenticated caller of a permission-checked operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}
