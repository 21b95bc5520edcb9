//! Tempo cache store
//!
//! Point lookup and staged insert of track tempos, committed by an explicit
//! flush. Entries are write-once: inserting a key that is already cached or
//! already staged is a no-op, never an overwrite and never an error.
//!
//! Staged inserts and flushes go through one async mutex, so concurrent
//! batch cycles never interleave a commit (single writer). Lookups read the
//! staging area first and then the database.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use pace_common::{Error, Result};
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::models::TrackKey;

/// Durable key → tempo storage used by the batch handler
#[async_trait]
pub trait TempoCache: Send + Sync {
    /// Cached tempo for `key`, `None` when not cached
    async fn lookup(&self, key: &TrackKey) -> Result<Option<f64>>;

    /// Stage a new entry; duplicate keys are ignored
    async fn insert(&self, key: &TrackKey, tempo: f64) -> Result<()>;

    /// Commit staged entries, returning how many were written
    ///
    /// A no-op returning 0 when nothing is staged.
    async fn flush(&self) -> Result<usize>;
}

/// SQLite implementation of [`TempoCache`]
pub struct SqliteTempoCache {
    pool: SqlitePool,
    staged: Mutex<Vec<(TrackKey, f64)>>,
}

impl SqliteTempoCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            staged: Mutex::new(Vec::new()),
        }
    }

    /// Private in-memory cache, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        let pool = pace_common::db::init_memory_database().await?;
        Ok(Self::new(pool))
    }

    /// Number of committed entries
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tempo_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// When the most recent entry was committed
    pub async fn last_cached_at(&self) -> Result<Option<NaiveDateTime>> {
        let latest: Option<NaiveDateTime> =
            sqlx::query_scalar("SELECT MAX(cached_at) FROM tempo_cache")
                .fetch_one(&self.pool)
                .await?;
        Ok(latest)
    }

    /// Number of entries waiting for the next flush
    pub async fn staged_count(&self) -> usize {
        self.staged.lock().await.len()
    }

    async fn committed_tempo(&self, key: &TrackKey) -> Result<Option<f64>> {
        let tempo: Option<f64> =
            sqlx::query_scalar("SELECT tempo FROM tempo_cache WHERE track_id = ? LIMIT 1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(tempo)
    }
}

#[async_trait]
impl TempoCache for SqliteTempoCache {
    async fn lookup(&self, key: &TrackKey) -> Result<Option<f64>> {
        {
            let staged = self.staged.lock().await;
            if let Some((_, tempo)) = staged.iter().find(|(k, _)| k == key) {
                return Ok(Some(*tempo));
            }
        }

        self.committed_tempo(key).await
    }

    async fn insert(&self, key: &TrackKey, tempo: f64) -> Result<()> {
        if !tempo.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Refusing to cache tempo {} for '{}'",
                tempo, key
            )));
        }

        if self.committed_tempo(key).await?.is_some() {
            tracing::debug!(key = %key, "Tempo already cached, ignoring insert");
            return Ok(());
        }

        // A row committed after the check above is skipped by INSERT OR IGNORE
        let mut staged = self.staged.lock().await;
        if staged.iter().any(|(k, _)| k == key) {
            tracing::debug!(key = %key, "Tempo already staged, ignoring insert");
            return Ok(());
        }

        staged.push((key.clone(), tempo));
        Ok(())
    }

    async fn flush(&self) -> Result<usize> {
        let mut staged = self.staged.lock().await;

        if staged.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;

        for (key, tempo) in staged.iter() {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO tempo_cache (track_id, tempo) VALUES (?, ?)",
            )
            .bind(key.as_str())
            .bind(*tempo)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected() as usize;
        }

        // Staged entries survive a failed commit and go out with the next flush
        tx.commit().await?;
        staged.clear();

        tracing::debug!(written, "Tempo cache flushed");
        Ok(written)
    }
}
