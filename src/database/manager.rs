use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::schema;

/// Errors from the credential store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Map unique-constraint violations to `Conflict`, keeping everything else
    pub fn from_write(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => DatabaseError::Conflict(what.into()),
            _ => DatabaseError::Sqlx(err),
        }
    }
}

/// Builds the SQLite pool and keeps the schema installed
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if Self::is_memory_url(&config.url) {
            // Every connection to :memory: is a separate database, so pin a single one forever
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        schema::install(&pool).await?;

        info!("Connected credential store: {}", config.url);
        Ok(pool)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    fn is_memory_url(url: &str) -> bool {
        url.contains(":memory:") || url.contains("mode=memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 4,
            lookup_timeout_ms: 1000,
        }
    }

    #[test]
    fn recognizes_memory_urls() {
        assert!(DatabaseManager::is_memory_url("sqlite::memory:"));
        assert!(DatabaseManager::is_memory_url("sqlite://file.db?mode=memory"));
        assert!(!DatabaseManager::is_memory_url("sqlite://fintrack.db"));
    }

    #[tokio::test]
    async fn connects_and_installs_schema() {
        let pool = DatabaseManager::connect(&memory_config()).await.unwrap();
        DatabaseManager::health_check(&pool).await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"principals"));
        assert!(names.contains(&"admin_grants"));
    }

    #[tokio::test]
    async fn schema_install_is_idempotent() {
        let pool = DatabaseManager::connect(&memory_config()).await.unwrap();
        schema::install(&pool).await.unwrap();
        schema::install(&pool).await.unwrap();
    }
}
