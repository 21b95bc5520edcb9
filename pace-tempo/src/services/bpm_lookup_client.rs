//! BPM lookup service client
//!
//! One POST translates a batch of [`LookupRecord`] requests into result
//! records with `tempo` populated for every recording the service knows.
//! Results carry no positional relationship to the request.
//!
//! Status handling:
//! - 2xx: success, body is a JSON array of records
//! - 3xx: the service's "try later" signal, reported as [`LookupError::TimedOut`]
//! - 4xx and 5xx: [`LookupError::Status`] with the code
//!
//! Redirect following is disabled so 3xx responses reach the classifier.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use pace_common::config::LookupConfig;
use reqwest::Client;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::LookupError;
use crate::models::LookupRecord;

const USER_AGENT: &str = concat!("Pace/", env!("CARGO_PKG_VERSION"));

/// A single round-trip to a BPM lookup backend
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn run_lookup(&self, records: &[LookupRecord]) -> Result<Vec<LookupRecord>, LookupError>;
}

/// HTTP client for the BPM lookup service
pub struct BpmLookupClient {
    http_client: Client,
    lookup_url: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl BpmLookupClient {
    pub fn new(
        lookup_url: impl Into<String>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, LookupError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let per_second = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            LookupError::InvalidRequest("requests_per_second must be non-zero".to_string())
        })?;

        Ok(Self {
            http_client,
            lookup_url: lookup_url.into(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    pub fn from_config(config: &LookupConfig) -> Result<Self, LookupError> {
        Self::new(
            config.url.clone(),
            config.timeout(),
            config.requests_per_second,
        )
    }

    pub fn lookup_url(&self) -> &str {
        &self.lookup_url
    }
}

/// Map an HTTP status to the lookup failure classes
pub(crate) fn classify_status(status: u16) -> Option<LookupError> {
    match status / 100 {
        2 => None,
        3 => Some(LookupError::TimedOut),
        // 4xx, 5xx and anything unexpected
        _ => Some(LookupError::Status(status)),
    }
}

fn classify_transport(err: reqwest::Error) -> LookupError {
    if err.is_timeout() {
        LookupError::TimedOut
    } else {
        LookupError::Network(err.to_string())
    }
}

#[async_trait]
impl LookupService for BpmLookupClient {
    async fn run_lookup(&self, records: &[LookupRecord]) -> Result<Vec<LookupRecord>, LookupError> {
        if records.is_empty() {
            return Err(LookupError::InvalidRequest(
                "lookup batch must not be empty".to_string(),
            ));
        }

        self.rate_limiter.until_ready().await;

        tracing::debug!(
            url = %self.lookup_url,
            records = records.len(),
            "Sending BPM lookup request"
        );

        let response = self
            .http_client
            .post(&self.lookup_url)
            .json(records)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status().as_u16();
        tracing::debug!(status, "BPM lookup responded");

        if let Some(err) = classify_status(status) {
            return Err(err);
        }

        let body = response.bytes().await.map_err(classify_transport)?;
        let results: Vec<LookupRecord> =
            serde_json::from_slice(&body).map_err(|e| LookupError::Parse(e.to_string()))?;

        tracing::debug!(
            requested = records.len(),
            returned = results.len(),
            "BPM lookup successful"
        );

        Ok(results)
    }
}
