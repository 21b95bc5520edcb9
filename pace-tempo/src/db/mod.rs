//! Database access for pace-tempo
//!
//! Durable track id → tempo cache backed by the shared SQLite database

pub mod tempo_cache;

pub use tempo_cache::{SqliteTempoCache, TempoCache};

use pace_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the tempo cache database pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    pace_common::db::init_database(db_path).await
}
