//! Utility modules for pace-tempo

pub mod lookup_retry;

pub use lookup_retry::{backoff_delay, retry_on_timeout, RetryingLookup};
