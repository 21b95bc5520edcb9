//! Lookup Retry Logic
//!
//! Hides transient lookup failures from the batch handler with a bounded,
//! capped quadratic backoff.
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. If successful, return result
//! 3. If the lookup timed out and attempts remain: log WARN, back off, retry
//! 4. If the lookup timed out on the last attempt: log ERROR, return `RetriesExhausted`
//! 5. If other error: return error immediately (no retry)
//!
//! **Backoff Strategy:** the delay before attempt `i` (1-indexed, `i >= 2`)
//! is `min(i, 6)²` seconds: 4, 9, 16, 25, 36, 36, ...

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LookupError, TempoError};
use crate::models::lookup_record::{describe, LookupRecord};
use crate::services::bpm_lookup_client::LookupService;

/// Default total attempts for a deep lookup
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Delay before `attempt` (1-indexed); zero for the first attempt
pub fn backoff_delay(attempt: u32) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let r = u64::from(attempt.min(6));
    Duration::from_secs(r * r)
}

/// Retry `operation` while it fails with a retryable [`LookupError`]
///
/// # Arguments
/// * `operation_name` - Description of what is being looked up, for logging
///   and for the `RetriesExhausted` error
/// * `max_attempts` - Total attempts including the first
/// * `operation` - Async closure performing one lookup
pub async fn retry_on_timeout<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> Result<T, TempoError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LookupError>>,
{
    for attempt in 1..=max_attempts {
        if attempt > 1 {
            let delay = backoff_delay(attempt);
            tracing::warn!(
                operation = operation_name,
                attempt,
                backoff_secs = delay.as_secs(),
                "Lookup timed out, will retry after backoff"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Lookup succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if err.is_retryable() => continue,
            Err(err) => {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Lookup failed with non-retryable error"
                );
                return Err(TempoError::Lookup(err));
            }
        }
    }

    tracing::error!(
        operation = operation_name,
        attempts = max_attempts,
        "Lookup failed: retries exhausted"
    );
    Err(TempoError::RetriesExhausted {
        attempts: max_attempts,
        records: operation_name.to_string(),
    })
}

/// Lookup service wrapper that applies [`retry_on_timeout`] to every call
#[derive(Clone)]
pub struct RetryingLookup {
    inner: Arc<dyn LookupService>,
    max_attempts: u32,
}

impl RetryingLookup {
    pub fn new(inner: Arc<dyn LookupService>) -> Self {
        Self::with_max_attempts(inner, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(inner: Arc<dyn LookupService>, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Look up tempos for `records`, retrying timeouts
    pub async fn lookup_bpm(&self, records: &[LookupRecord]) -> Result<Vec<LookupRecord>, TempoError> {
        let description = describe(records);
        tracing::info!(records = records.len(), "Looking up {}", description);

        retry_on_timeout(&description, self.max_attempts, || {
            self.inner.run_lookup(records)
        })
        .await
    }
}
