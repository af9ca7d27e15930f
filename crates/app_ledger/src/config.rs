//! Ledger configuration

use serde::Deserialize;

use infra_eventstore::DatabaseConfig;

/// Which event store adapter to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Ledger configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    /// Maximum pool size
    pub max_connections: u32,
    /// Log filter, e.g. `info` or `app_ledger=debug`
    pub log_level: String,
    pub store_backend: StoreBackend,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/ledger".to_string(),
            max_connections: 10,
            log_level: "info".to_string(),
            store_backend: StoreBackend::Postgres,
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from `LEDGER_`-prefixed environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("LEDGER").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Loads `.env` if present, then reads the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url).max_connections(self.max_connections)
    }
}
