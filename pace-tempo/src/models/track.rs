//! Catalog tracks and their cache keys

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable catalog identifier for a track, used as the tempo cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackKey(String);

impl TrackKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TrackKey {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A song or music video from the user's catalog or library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackKey,
    pub title: String,
    #[serde(rename = "artist")]
    pub artist_name: String,
    #[serde(rename = "album", default)]
    pub album_title: Option<String>,
    /// International Standard Recording Code, when the catalog supplied one
    #[serde(default)]
    pub isrc: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

impl Track {
    pub fn new(id: impl Into<TrackKey>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: artist.into(),
            album_title: None,
            isrc: None,
            duration_secs: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album_title = Some(album.into());
        self
    }

    pub fn with_isrc(mut self, isrc: impl Into<String>) -> Self {
        self.isrc = Some(isrc.into());
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Whether two tracks denote the same recording in a working set
    ///
    /// Same catalog id, or the same title, album, artist and duration
    /// (library and catalog copies of one song carry different ids).
    pub fn is_same_track(&self, other: &Track) -> bool {
        self.id == other.id
            || (self.title == other.title
                && self.album_title == other.album_title
                && self.artist_name == other.artist_name
                && self.duration_secs == other.duration_secs)
    }
}

/// A song returned by a catalog search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSong {
    pub title: String,
    pub artist_name: String,
    pub isrc: Option<String>,
}
