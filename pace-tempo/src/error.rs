//! Error types for pace-tempo
//!
//! Two layers: [`LookupError`] describes how a single call to the BPM
//! lookup service failed, [`TempoError`] is the terminal outcome handed to
//! an individual track's resolver.

use thiserror::Error;

/// Failure of one round-trip to the BPM lookup service
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// Service asked us to come back later (3xx) or the request timed out
    #[error("Lookup request timed out")]
    TimedOut,

    /// Service rejected the request (4xx) or failed (5xx)
    #[error("Lookup service returned status {0}")]
    Status(u16),

    /// Transport failure other than a timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not a JSON array of lookup records
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request could not be built (e.g. empty batch)
    #[error("Invalid lookup request: {0}")]
    InvalidRequest(String),
}

impl LookupError {
    /// Only the "timed out" classification is retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Terminal resolution failure for one track
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TempoError {
    /// Deep lookup succeeded but had no matching result for this record
    #[error("Item {0} not found in lookup service")]
    NotFoundInService(String),

    /// Every attempt at the deep lookup timed out
    #[error("Ran out of retry attempts ({attempts}) for looking up {records}")]
    RetriesExhausted { attempts: u32, records: String },

    /// Deep lookup failed with a non-retryable error
    #[error("Lookup failed: {0}")]
    Lookup(#[from] LookupError),

    /// ISRC resolution or request building failed
    #[error("Metadata lookup failed: {0}")]
    Metadata(String),

    /// Cache store read or write failed
    #[error("Cache storage error: {0}")]
    CacheStorage(String),

    /// Item was dropped before anything resolved it
    #[error("Resolution abandoned: {0}")]
    Abandoned(String),
}

impl From<pace_common::Error> for TempoError {
    fn from(err: pace_common::Error) -> Self {
        Self::CacheStorage(err.to_string())
    }
}

/// Playlist export failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    /// The user's playlist library rejected a lookup, create or edit
    #[error("Playlist library error: {0}")]
    Library(String),
}
