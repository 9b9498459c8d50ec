//! Opening the SurrealDB store used by the server.

use std::fmt;

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// Where the store lives and how to sign in to it.
///
/// Every field has a local-development default, so a settings file only
/// needs to name what differs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// WebSocket endpoint without scheme, e.g. `127.0.0.1:8000`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "hemolab".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

// Settings are logged at startup; keep the password out of them.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A signed-in client whose schema is current.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Sign in as root, select the namespace and database, then apply
    /// any pending migrations.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Opening SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace).use_db(&config.database).await?;

        run_migrations(&db).await?;
        info!(database = %config.database, "SurrealDB ready");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_password() {
        let config = DbConfig {
            password: "s3cret-root".into(),
            ..Default::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret-root"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("hemolab"));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: DbConfig = serde_json::from_value(serde_json::json!({
            "url": "db.internal:8000",
        }))
        .unwrap();
        assert_eq!(config.url, "db.internal:8000");
        assert_eq!(config.namespace, "hemolab");
        assert_eq!(config.username, "root");
    }
}
