//! Error types for the Hemolab system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HemolabError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// A state transition was attempted on an entity that has already
    /// left the state the transition starts from.
    #[error("Invalid state: {entity} {id} is already {status}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HemolabError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// True for errors caused by stale client data rather than a fault.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

pub type HemolabResult<T> = Result<T, HemolabError>;
