//! Music catalog metadata collaborator
//!
//! The lookup service matches best on ISRC, which library tracks often
//! lack. [`resolve_isrc`] tries three sources in order:
//! 1. The ISRC already on the track
//! 2. Extended catalog metadata for the track
//! 3. A "title by artist" catalog search, taking the first top-result song
//!    whose title and artist match exactly

use async_trait::async_trait;

use crate::error::TempoError;
use crate::models::{CatalogSong, Track};

/// Catalog access needed to fill in missing ISRCs
#[async_trait]
pub trait CatalogMetadata: Send + Sync {
    /// ISRC from the track's extended catalog metadata
    async fn fetch_isrc(&self, track: &Track) -> Result<Option<String>, TempoError>;

    /// Top song results for a free-text query
    async fn search_top_songs(&self, term: &str) -> Result<Vec<CatalogSong>, TempoError>;
}

/// Catalog with no data, for environments without catalog access
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCatalog;

#[async_trait]
impl CatalogMetadata for NullCatalog {
    async fn fetch_isrc(&self, _track: &Track) -> Result<Option<String>, TempoError> {
        Ok(None)
    }

    async fn search_top_songs(&self, _term: &str) -> Result<Vec<CatalogSong>, TempoError> {
        Ok(Vec::new())
    }
}

/// Search term used for the last-resort catalog lookup
pub fn search_term(track: &Track) -> String {
    format!("{} by {}", track.title, track.artist_name)
}

/// Best-effort ISRC for `track`; `Ok(None)` when all three sources come up empty
pub async fn resolve_isrc(
    track: &Track,
    catalog: &dyn CatalogMetadata,
) -> Result<Option<String>, TempoError> {
    if let Some(isrc) = &track.isrc {
        return Ok(Some(isrc.clone()));
    }

    if let Some(isrc) = catalog.fetch_isrc(track).await? {
        return Ok(Some(isrc));
    }

    let results = catalog.search_top_songs(&search_term(track)).await?;
    let isrc = results
        .into_iter()
        .find(|song| song.title == track.title && song.artist_name == track.artist_name)
        .and_then(|song| song.isrc);

    if isrc.is_none() {
        tracing::debug!(
            track_id = %track.id,
            title = %track.title,
            "No ISRC found for track, looking up by name"
        );
    }

    Ok(isrc)
}
