//! Database schema bootstrap.
//!
//! Schema management is idempotent and keyed off the live schema: tables
//! are created if absent, then any column missing from an older deployment
//! is added non-destructively. There is no migration-version store.

use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Create tables and bring an existing schema up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Checking database schema...");

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS maps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            network TEXT,
            community TEXT
        )"#,
    )
    .execute(pool)
    .await
    .context("Failed to create maps table")?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS devices (
            ip TEXT,
            map_id INTEGER,
            sysName TEXT,
            sysDescr TEXT,
            sysObjectID TEXT,
            device_type TEXT DEFAULT 'router',
            last_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (ip, map_id),
            FOREIGN KEY(map_id) REFERENCES maps(id)
        )"#,
    )
    .execute(pool)
    .await
    .context("Failed to create devices table")?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            map_id INTEGER,
            source_ip TEXT,
            target_ip TEXT,
            source_port TEXT,
            target_port TEXT,
            protocol TEXT,
            speed TEXT,
            status TEXT,
            source_vlan TEXT,
            target_vlan TEXT,
            source_is_root INTEGER DEFAULT 0,
            target_is_root INTEGER DEFAULT 0,
            FOREIGN KEY(map_id) REFERENCES maps(id)
        )"#,
    )
    .execute(pool)
    .await
    .context("Failed to create links table")?;

    // Columns added after the first release; older databases lack them.
    ensure_column(pool, "maps", "network", "TEXT").await?;
    ensure_column(pool, "maps", "community", "TEXT").await?;

    ensure_column(pool, "devices", "device_type", "TEXT DEFAULT 'router'").await?;

    ensure_column(pool, "links", "map_id", "INTEGER DEFAULT 1").await?;
    ensure_column(pool, "links", "speed", "TEXT").await?;
    ensure_column(pool, "links", "status", "TEXT").await?;
    ensure_column(pool, "links", "source_vlan", "TEXT").await?;
    ensure_column(pool, "links", "target_vlan", "TEXT").await?;
    ensure_column(pool, "links", "source_is_root", "INTEGER DEFAULT 0").await?;
    ensure_column(pool, "links", "target_is_root", "INTEGER DEFAULT 0").await?;

    info!("Database schema up to date");
    Ok(())
}

/// Add `column` to `table` unless live-schema introspection shows it.
async fn ensure_column(pool: &SqlitePool, table: &str, column: &str, decl: &str) -> Result<()> {
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to introspect table {table}"))?;

    let present = rows
        .iter()
        .any(|row| row.get::<String, _>("name") == column);
    if present {
        return Ok(());
    }

    info!("Adding column {column} to {table}");
    sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))
        .execute(pool)
        .await
        .with_context(|| format!("Failed to add {table}.{column}"))?;
    Ok(())
}
