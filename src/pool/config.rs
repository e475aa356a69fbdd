use crate::connection::ConnectionParameters;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "LIFEBUOY";

/// Named connections and the name used when a query names none
///
/// ```toml
/// [database]
/// default = "default"
///
/// [database.connections.default]
/// url = "app.db"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_connection_name")]
    pub default: String,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionParameters>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default: default_connection_name(),
            connections: BTreeMap::new(),
        }
    }
}

pub(crate) fn default_connection_name() -> String {
    "default".to_string()
}

impl DatabaseConfig {
    /// Load the database configuration from `config/config.toml`, falling back to env vars.
    ///
    /// Environment variables use the `LIFEBUOY` prefix and `__` as the nesting
    /// separator, e.g. `LIFEBUOY__DATABASE__CONNECTIONS__DEFAULT__URL=app.db`.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("Failed to load config file, falling back to env. Error: {}", err);
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Parse a literal TOML document containing a `[database]` table
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?;
        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        let mut db_config: DatabaseConfig = settings.get::<DatabaseConfig>("database").map_err(|e| {
            ConfigError::Message(format!(
                "Database configuration could not be loaded from file or environment: {}",
                e
            ))
        })?;

        if db_config.default.trim().is_empty() {
            db_config.default = default_connection_name();
        }
        Ok(db_config)
    }
}
