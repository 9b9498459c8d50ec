//! SurrealDB repository implementations.

mod change_request;
mod notification;
mod user;

use std::fmt::Display;
use std::str::FromStr;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

pub use change_request::SurrealChangeRequestRepository;
pub use notification::SurrealNotificationRepository;
pub use user::{SurrealUserRepository, verify_password};

/// Row struct for `count()` queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {what}: {e}")))
}

fn parse_optional_uuid(raw: Option<&str>, what: &str) -> Result<Option<Uuid>, DbError> {
    raw.map(|s| parse_uuid(s, what)).transpose()
}

/// Parse a stored enum wire name back into its domain type.
fn parse_enum<T>(raw: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| DbError::Decode(e.to_string()))
}
