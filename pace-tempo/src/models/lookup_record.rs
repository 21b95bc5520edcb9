//! Lookup records exchanged with the BPM lookup service
//!
//! Requests go out with `tempo` absent; results come back with `tempo` set
//! for the records the service could find. Results are NOT guaranteed to
//! keep input order or count, so they are paired with requests through
//! [`LookupRecord::matches`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::track::Track;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRecord {
    /// Beats per minute, absent until resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isrc: Option<String>,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    pub title: String,
}

impl LookupRecord {
    /// Build the request record for a track with an already-resolved ISRC
    pub fn for_track(track: &Track, isrc: Option<String>) -> Self {
        Self {
            tempo: None,
            isrc,
            artist: track.artist_name.clone(),
            album: track.album_title.clone(),
            title: track.title.clone(),
        }
    }

    /// Fuzzy identity used to pair a returned record with its request
    ///
    /// Records match when both ISRCs are present and equal. Otherwise artist,
    /// album and title must all be equal once non-ASCII characters and
    /// `"`, `'`, `&` have been stripped from each side.
    ///
    /// This is reflexive and symmetric but not transitive, which is why it is
    /// a method and not a `PartialEq` impl. The derived `PartialEq` is plain
    /// structural equality.
    pub fn matches(&self, other: &LookupRecord) -> bool {
        if let (Some(lhs), Some(rhs)) = (&self.isrc, &other.isrc) {
            if lhs == rhs {
                return true;
            }
        }

        normalize(&self.artist) == normalize(&other.artist)
            && self.album.as_deref().map(normalize) == other.album.as_deref().map(normalize)
            && normalize(&self.title) == normalize(&other.title)
    }
}

impl fmt::Display for LookupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.isrc {
            Some(isrc) => f.write_str(isrc),
            None => f.write_str(&self.title),
        }
    }
}

/// Drop smart quotes and other non-ASCII, plus the characters the service
/// spells inconsistently.
///
/// Filtering is per Unicode scalar value, so a decomposed "o\u{0308}" keeps
/// its base letter ("Bjork"). The Pace app strips whole grapheme clusters
/// and would drop it ("Bjrk"); precomposed input behaves the same in both.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii() && !matches!(c, '"' | '\'' | '&'))
        .collect()
}

/// Comma-separated record descriptions for log and error messages
pub fn describe(records: &[LookupRecord]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
