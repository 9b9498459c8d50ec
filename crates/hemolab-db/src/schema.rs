//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings and enums as
//! their lowercase wire names, guarded by ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "access_control",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: users, change requests, notifications
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['user', 'editor', 'maintainer', 'superadmin'];
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD password_reset_required ON TABLE user TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_role ON TABLE user COLUMNS role;

-- =======================================================================
-- Change requests (proposed user mutations awaiting approval)
-- =======================================================================
DEFINE TABLE change_request SCHEMAFULL;
DEFINE FIELD kind ON TABLE change_request TYPE string \
    ASSERT $value IN ['create', 'update', 'delete'];
DEFINE FIELD target_user_id ON TABLE change_request TYPE option<string>;
DEFINE FIELD requested_by ON TABLE change_request TYPE string;
DEFINE FIELD requested_by_name ON TABLE change_request TYPE string;
DEFINE FIELD requested_by_role ON TABLE change_request TYPE string \
    ASSERT $value IN ['user', 'editor', 'maintainer', 'superadmin'];
DEFINE FIELD payload ON TABLE change_request TYPE object;
DEFINE FIELD payload.name ON TABLE change_request TYPE option<string>;
DEFINE FIELD payload.email ON TABLE change_request TYPE option<string>;
DEFINE FIELD payload.role ON TABLE change_request TYPE option<string>;
DEFINE FIELD original_payload ON TABLE change_request \
    TYPE option<object>;
DEFINE FIELD original_payload.name ON TABLE change_request \
    TYPE option<string>;
DEFINE FIELD original_payload.email ON TABLE change_request \
    TYPE option<string>;
DEFINE FIELD original_payload.role ON TABLE change_request \
    TYPE option<string>;
DEFINE FIELD status ON TABLE change_request TYPE string \
    ASSERT $value IN ['pending', 'approved', 'rejected'] \
    DEFAULT 'pending';
DEFINE FIELD approved_by ON TABLE change_request TYPE option<string>;
DEFINE FIELD approved_at ON TABLE change_request TYPE option<datetime>;
DEFINE FIELD rejected_by ON TABLE change_request TYPE option<string>;
DEFINE FIELD rejected_at ON TABLE change_request TYPE option<datetime>;
DEFINE FIELD rejection_reason ON TABLE change_request \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE change_request TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_change_request_status ON TABLE change_request \
    COLUMNS status;
DEFINE INDEX idx_change_request_requested_by ON TABLE change_request \
    COLUMNS requested_by;

-- =======================================================================
-- Notifications (per-recipient inbox)
-- =======================================================================
DEFINE TABLE notification SCHEMAFULL;
DEFINE FIELD kind ON TABLE notification TYPE string \
    ASSERT $value IN ['request_submitted', 'request_approved', \
    'request_rejected'];
DEFINE FIELD recipient_id ON TABLE notification TYPE string;
DEFINE FIELD title ON TABLE notification TYPE string;
DEFINE FIELD message ON TABLE notification TYPE string;
DEFINE FIELD read ON TABLE notification TYPE bool DEFAULT false;
DEFINE FIELD read_at ON TABLE notification TYPE option<datetime>;
DEFINE FIELD metadata ON TABLE notification TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE notification TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_notification_recipient ON TABLE notification \
    COLUMNS recipient_id, read;
";

/// Apply all pending migrations in version order.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    info!(
        from = current_version,
        to = MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
        "Schema up to date"
    );

    Ok(())
}
