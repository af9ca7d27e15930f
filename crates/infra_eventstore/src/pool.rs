//! PostgreSQL pool for the event store
//!
//! [`connect_pool`] hands out a pool only after the `events` schema is
//! migrated, so the adapter never runs against a missing table.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::StoreError;

pub type DatabasePool = PgPool;

/// Connection settings for the event store database
///
/// ```rust
/// use infra_eventstore::DatabaseConfig;
///
/// let config = DatabaseConfig::new("postgres://localhost/ledger").max_connections(4);
/// assert_eq!(config.max_connections, 4);
/// assert!(config.migrate);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Never above `max_connections`
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// Apply the bundled migrations when connecting
    pub migrate: bool,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            migrate: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self.min_connections = self.min_connections.min(max);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Leaves the schema alone, for databases migrated out of band
    pub fn without_migrations(mut self) -> Self {
        self.migrate = false;
        self
    }
}

/// Opens the pool and, unless disabled, brings the schema up to date
///
/// # Errors
///
/// Returns [`StoreError::ConnectionFailed`] for an empty pool size or an
/// unreachable database, and [`StoreError::MigrationFailed`] if a
/// migration does not apply.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<DatabasePool, StoreError> {
    if config.max_connections == 0 {
        return Err(StoreError::ConnectionFailed(
            "max_connections must be at least 1".to_string(),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
    info!(max_connections = config.max_connections, "Connected to event store database");

    if config.migrate {
        run_migrations(&pool).await?;
    }
    Ok(pool)
}

/// Applies the bundled `events` schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), StoreError> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await?;
    info!(migrations = migrator.migrations.len(), "Event store schema up to date");
    Ok(())
}
