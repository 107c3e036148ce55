//! Map CRUD queries.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::Map;

/// Create a map, returning its id.
pub async fn create_map(pool: &SqlitePool, name: &str) -> Result<i64> {
    let result = sqlx::query("INSERT INTO maps (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// List all maps, newest first.
pub async fn list_maps(pool: &SqlitePool) -> Result<Vec<Map>> {
    let maps = sqlx::query_as::<_, Map>("SELECT * FROM maps ORDER BY created_at DESC")
        .fetch_all(pool)
        .await?;
    Ok(maps)
}

/// Find a map by id.
pub async fn find_map(pool: &SqlitePool, map_id: i64) -> Result<Option<Map>> {
    let map = sqlx::query_as::<_, Map>("SELECT * FROM maps WHERE id = ?")
        .bind(map_id)
        .fetch_optional(pool)
        .await?;
    Ok(map)
}

/// Rename a map; when both scan settings are supplied, save them too.
pub async fn update_map(
    pool: &SqlitePool,
    map_id: i64,
    name: &str,
    network: Option<&str>,
    community: Option<&str>,
) -> Result<()> {
    match (network, community) {
        (Some(network), Some(community)) => {
            sqlx::query("UPDATE maps SET name = ?, network = ?, community = ? WHERE id = ?")
                .bind(name)
                .bind(network)
                .bind(community)
                .bind(map_id)
                .execute(pool)
                .await?;
        }
        _ => {
            sqlx::query("UPDATE maps SET name = ? WHERE id = ?")
                .bind(name)
                .bind(map_id)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}

/// Delete a map together with its devices and links.
pub async fn delete_map(pool: &SqlitePool, map_id: i64) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM links WHERE map_id = ?")
        .bind(map_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM devices WHERE map_id = ?")
        .bind(map_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM maps WHERE id = ?")
        .bind(map_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}
