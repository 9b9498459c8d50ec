//! Server settings, loaded from an optional `hemolab` config file and
//! `HEMOLAB__*` environment variables (after reading `.env`).

use config::{Config as Cfg, ConfigError, Environment, File};
use hemolab_access::AccessConfig;
use hemolab_db::DbConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub database: DbConfig,
    pub access: AccessConfig,
    /// Account created when the store has no superadmin yet.
    pub bootstrap: Option<BootstrapSettings>,
    /// Prepended to passwords before Argon2id hashing.
    pub password_pepper: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapSettings {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl ServerSettings {
    /// `HEMOLAB__DATABASE__URL=db:8000` overrides `database.url`.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let settings = Cfg::builder()
            .add_source(File::with_name("hemolab").required(false))
            .add_source(Environment::with_prefix("HEMOLAB").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
