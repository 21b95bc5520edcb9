//! pace-tempo library interface
//!
//! Resolves track tempos (BPM) through a local cache backed by a batched,
//! retrying lookup against the remote BPM service.

pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ExportError, LookupError, TempoError};
pub use crate::models::{CatalogSong, LookupRecord, Track, TrackKey};
pub use crate::services::{TempoResolver, TempoService};
