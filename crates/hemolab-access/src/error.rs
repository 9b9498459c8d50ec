//! Access-layer error types.

use hemolab_core::error::HemolabError;
use hemolab_core::models::role::Role;
use hemolab_core::permission::{Action, Resource};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("role {role} may not {action} {resource}")]
    Forbidden {
        role: Role,
        resource: Resource,
        action: Action,
    },

    #[error("{operation} requires the {required} role")]
    RoleRequired {
        required: Role,
        operation: &'static str,
    },

    #[error("change request {id} is already {status}")]
    AlreadyResolved { id: String, status: String },

    #[error("invalid change request: {0}")]
    InvalidRequest(String),
}

impl From<AccessError> for HemolabError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Forbidden { .. } | AccessError::RoleRequired { .. } => {
                HemolabError::PermissionDenied {
                    reason: err.to_string(),
                }
            }
            AccessError::AlreadyResolved { id, status } => HemolabError::InvalidState {
                entity: "change_request".into(),
                id,
                status,
            },
            AccessError::InvalidRequest(message) => HemolabError::Validation { message },
        }
    }
}

/// Fail closed unless `role` holds `action` on `resource`.
pub(crate) fn require(role: Role, resource: Resource, action: Action) -> Result<(), AccessError> {
    if hemolab_core::permission::has_permission(role, resource, action) {
        Ok(())
    } else {
        Err(AccessError::Forbidden {
            role,
            resource,
            action,
        })
    }
}

/// Fail unless `role` is exactly `required`.
pub(crate) fn require_role(
    role: Role,
    required: Role,
    operation: &'static str,
) -> Result<(), AccessError> {
    if role == required {
        Ok(())
    } else {
        Err(AccessError::RoleRequired {
            required,
            operation,
        })
    }
}
