//! Data models for pace-tempo
//!
//! - Tracks from the music catalog and their stable cache keys
//! - Lookup records exchanged with the BPM lookup service

pub mod lookup_record;
pub mod track;

pub use lookup_record::LookupRecord;
pub use track::{CatalogSong, Track, TrackKey};
