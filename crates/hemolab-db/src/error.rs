//! Database-specific error types and conversions.

use hemolab_core::error::HemolabError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query rejected: {0}")]
    Query(String),

    /// A stored row could not be mapped back to a domain value.
    #[error("Corrupt row: {0}")]
    Decode(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    /// A unique index rejected the write.
    #[error("Duplicate {entity}: {detail}")]
    Duplicate { entity: String, detail: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for HemolabError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => HemolabError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => HemolabError::AlreadyExists { entity },
            DbError::Hash(msg) => HemolabError::Crypto(msg),
            other => HemolabError::Persistence(other.to_string()),
        }
    }
}
