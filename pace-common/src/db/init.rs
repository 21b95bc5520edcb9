//! Database initialization
//!
//! Opens (or creates) the tempo cache database and makes sure its schema
//! exists. All statements are idempotent, so this is safe on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open the database at `db_path`, creating the file and tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets lookups proceed while a flush is committing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tempo_cache_table(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the same schema
///
/// Limited to one connection: every `sqlite::memory:` connection is its own database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_tempo_cache_table(&pool).await?;

    Ok(pool)
}

/// Create the track id → tempo cache table
pub async fn create_tempo_cache_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tempo_cache (
            track_id TEXT PRIMARY KEY,
            tempo REAL NOT NULL,
            cached_at TEXT NOT NULL DEFAULT (datetime('now')),
            CHECK (length(track_id) > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_cache_table() {
        let pool = init_memory_database().await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tempo_cache")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        assert!(create_tempo_cache_table(&pool).await.is_ok());
    }
}
