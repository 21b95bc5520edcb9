//! Errors raised by configuration loading and the tempo cache database
//!
//! pace-tempo folds every variant into `TempoError::CacheStorage` when a
//! cache call fails inside a batch, so the message text is what reaches the
//! waiting track.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite connect, query or commit failure on the tempo cache
    #[cfg(feature = "sqlx")]
    #[error("Tempo cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the root folder or reading the config file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML or a setting outside its allowed range
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value the cache refuses to store, such as a non-finite tempo
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
