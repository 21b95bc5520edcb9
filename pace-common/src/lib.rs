//! # Pace Common Library
//!
//! Shared code for the Pace crates including:
//! - Error types
//! - Configuration loading and root folder resolution
//! - SQLite connection setup

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use config::TempoConfig;
pub use error::{Error, Result};
