//! Database connection pool management.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;

/// Application database state shared across the application.
#[derive(Debug, Clone)]
pub struct DbPool {
    pub pool: SqlitePool,
}

impl DbPool {
    /// Open (or create) the SQLite database and build a connection pool.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Opening database: {}", config.path);

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database at {}", config.path))?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool.
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Test the database connection.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
