//! Per-track tempo resolution
//!
//! [`TempoService::resolve`] hands out a [`TempoResolver`] and schedules the
//! track on the service's [`BatchScheduler`]. Every flushed batch runs
//! [`handle_batch`]:
//!
//! 1. Cache hits resolve at once. Misses get a [`LookupRecord`] (ISRC via
//!    the catalog fallback) and join the deep-lookup queue. A failure here
//!    only fails that one item.
//! 2. The queue goes out as one retrying lookup. If that fails, every
//!    queued item fails with the same error.
//! 3. Each queued record, in order, takes the first matching result with a
//!    tempo out of the pool. Matched tempos are cached.
//! 4. The cache is flushed once per batch.
//!
//! An item's result travels through its [`Promise`], which can be settled
//! only once and settles as [`TempoError::Abandoned`] if dropped unsettled.

use std::sync::Arc;
use std::time::Duration;

use pace_common::TempoConfig;
use tokio::sync::watch;

use crate::db::{SqliteTempoCache, TempoCache};
use crate::error::TempoError;
use crate::models::{LookupRecord, Track};
use crate::services::batch_scheduler::BatchScheduler;
use crate::services::bpm_lookup_client::{BpmLookupClient, LookupService};
use crate::services::catalog::{resolve_isrc, CatalogMetadata, NullCatalog};
use crate::utils::RetryingLookup;

/// Observable resolution state of one track
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    Loading,
    Resolved(f64),
    Failed(TempoError),
}

impl ResolutionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn tempo(&self) -> Option<f64> {
        match self {
            Self::Resolved(tempo) => Some(*tempo),
            _ => None,
        }
    }
}

impl From<Result<f64, TempoError>> for ResolutionState {
    fn from(result: Result<f64, TempoError>) -> Self {
        match result {
            Ok(tempo) => Self::Resolved(tempo),
            Err(err) => Self::Failed(err),
        }
    }
}

/// One-shot completion signal for a scheduled track
pub struct Promise {
    track: Track,
    sender: Option<watch::Sender<ResolutionState>>,
}

impl Promise {
    fn new(track: Track, sender: watch::Sender<ResolutionState>) -> Self {
        Self {
            track,
            sender: Some(sender),
        }
    }

    /// Publish the terminal result
    pub fn resolve(mut self, result: Result<f64, TempoError>) {
        self.settle(result);
    }

    fn settle(&mut self, result: Result<f64, TempoError>) {
        let Some(sender) = self.sender.take() else {
            return;
        };

        if let Err(err) = &result {
            tracing::warn!(
                track_id = %self.track.id,
                title = %self.track.title,
                error = %err,
                "Unresolved track"
            );
        }

        sender.send_replace(ResolutionState::from(result));
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if self.sender.is_some() {
            let reason = format!("track {} was dropped before its lookup finished", self.track.id);
            self.settle(Err(TempoError::Abandoned(reason)));
        }
    }
}

/// A track waiting in the batch scheduler, paired with its promise
pub struct PendingTempo {
    pub track: Track,
    pub promise: Promise,
}

impl PendingTempo {
    /// A pending item and the resolver that observes it
    pub fn new(track: Track) -> (Self, TempoResolver) {
        let (sender, receiver) = watch::channel(ResolutionState::Loading);
        let pending = Self {
            promise: Promise::new(track.clone(), sender),
            track: track.clone(),
        };
        let resolver = TempoResolver {
            track,
            state: receiver,
        };
        (pending, resolver)
    }
}

/// Per-track tempo handle held by the working set
///
/// Observers read state from the resolver's watch channel; it changes from
/// `Loading` to a terminal state exactly once.
#[derive(Debug, Clone)]
pub struct TempoResolver {
    track: Track,
    state: watch::Receiver<ResolutionState>,
}

impl TempoResolver {
    /// A resolver whose outcome is already known
    pub fn settled(track: Track, result: Result<f64, TempoError>) -> Self {
        let (_sender, receiver) = watch::channel(ResolutionState::from(result));
        Self {
            track,
            state: receiver,
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn state(&self) -> ResolutionState {
        self.state.borrow().clone()
    }

    pub fn tempo(&self) -> Option<f64> {
        self.state.borrow().tempo()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.state.clone()
    }

    /// Wait for the terminal state
    pub async fn wait(&self) -> Result<f64, TempoError> {
        let mut state = self.state.clone();
        // A settled sender always publishes before it goes away, so the
        // closed-channel case still finds the terminal value
        let waited = state
            .wait_for(|s| !s.is_loading())
            .await
            .map(|value| value.clone());
        let terminal = match waited {
            Ok(value) => value,
            Err(_) => state.borrow().clone(),
        };

        match terminal {
            ResolutionState::Resolved(tempo) => Ok(tempo),
            ResolutionState::Failed(err) => Err(err),
            ResolutionState::Loading => Err(TempoError::Abandoned(format!(
                "track {} never resolved",
                self.track.id
            ))),
        }
    }
}

/// Resolve one flushed batch
pub async fn handle_batch(
    batch: Vec<PendingTempo>,
    cache: &dyn TempoCache,
    lookup: &RetryingLookup,
    catalog: &dyn CatalogMetadata,
) {
    let mut deep_lookup: Vec<(LookupRecord, PendingTempo)> = Vec::new();

    for pending in batch {
        match cache.lookup(&pending.track.id).await {
            Ok(Some(tempo)) => {
                tracing::debug!(track_id = %pending.track.id, tempo, "Found tempo in the cache");
                pending.promise.resolve(Ok(tempo));
            }
            Ok(None) => match resolve_isrc(&pending.track, catalog).await {
                Ok(isrc) => {
                    let record = LookupRecord::for_track(&pending.track, isrc);
                    deep_lookup.push((record, pending));
                }
                Err(err) => pending.promise.resolve(Err(as_metadata_error(err))),
            },
            Err(err) => pending.promise.resolve(Err(err.into())),
        }
    }

    if !deep_lookup.is_empty() {
        lookup_and_cache(deep_lookup, cache, lookup).await;
    }

    match cache.flush().await {
        Ok(written) => tracing::debug!(written, "Flushed tempo cache after batch"),
        Err(e) => tracing::error!(error = %e, "Failed to flush tempo cache"),
    }
}

async fn lookup_and_cache(
    deep_lookup: Vec<(LookupRecord, PendingTempo)>,
    cache: &dyn TempoCache,
    lookup: &RetryingLookup,
) {
    let records: Vec<LookupRecord> = deep_lookup.iter().map(|(record, _)| record.clone()).collect();

    let mut pool = match lookup.lookup_bpm(&records).await {
        Ok(results) => results,
        Err(err) => {
            for (_, pending) in deep_lookup {
                pending.promise.resolve(Err(err.clone()));
            }
            return;
        }
    };

    for (record, pending) in deep_lookup {
        let hit = pool.iter().enumerate().find_map(|(i, result)| match result.tempo {
            Some(tempo) if result.matches(&record) => Some((i, tempo)),
            _ => None,
        });

        let Some((index, tempo)) = hit else {
            pending
                .promise
                .resolve(Err(TempoError::NotFoundInService(record.to_string())));
            continue;
        };

        // One result satisfies one requester
        pool.remove(index);

        match cache.insert(&pending.track.id, tempo).await {
            Ok(()) => pending.promise.resolve(Ok(tempo)),
            Err(err) => pending.promise.resolve(Err(err.into())),
        }
    }
}

fn as_metadata_error(err: TempoError) -> TempoError {
    match err {
        TempoError::Metadata(_) => err,
        other => TempoError::Metadata(other.to_string()),
    }
}

/// Long-lived owner of the resolution pipeline
pub struct TempoService {
    scheduler: BatchScheduler<PendingTempo>,
}

impl TempoService {
    pub fn new(
        cache: Arc<dyn TempoCache>,
        lookup: RetryingLookup,
        catalog: Arc<dyn CatalogMetadata>,
        batch_size: usize,
        max_delay: Duration,
    ) -> Self {
        let max_attempts = lookup.max_attempts();
        let scheduler = BatchScheduler::new(batch_size, max_delay, move |batch: Vec<PendingTempo>| {
            let cache = cache.clone();
            let lookup = lookup.clone();
            let catalog = catalog.clone();
            async move {
                handle_batch(batch, cache.as_ref(), &lookup, catalog.as_ref()).await;
            }
        });

        tracing::debug!(
            batch_size = scheduler.batch_size(),
            max_delay_ms = scheduler.max_delay().as_millis() as u64,
            max_attempts,
            "Tempo batch scheduler started"
        );

        Self { scheduler }
    }

    /// Service with the configured batching and retry settings
    pub fn with_config(
        cache: Arc<dyn TempoCache>,
        lookup: Arc<dyn LookupService>,
        catalog: Arc<dyn CatalogMetadata>,
        config: &TempoConfig,
    ) -> Self {
        let lookup = RetryingLookup::with_max_attempts(lookup, config.lookup.max_attempts);
        Self::new(
            cache,
            lookup,
            catalog,
            config.batch.size,
            config.batch.max_delay(),
        )
    }

    /// SQLite cache under `root_folder`, HTTP lookup client and no catalog
    pub async fn open(config: &TempoConfig, root_folder: &std::path::Path) -> Result<Self, TempoError> {
        let db_path = pace_common::config::database_path(root_folder);
        let pool = crate::db::init_database_pool(&db_path).await?;
        let client = BpmLookupClient::from_config(&config.lookup)?;

        tracing::info!(
            database = %db_path.display(),
            lookup_url = client.lookup_url(),
            "Tempo service ready"
        );

        Ok(Self::with_config(
            Arc::new(SqliteTempoCache::new(pool)),
            Arc::new(client),
            Arc::new(NullCatalog),
            config,
        ))
    }

    /// Create the resolver for `track` and schedule its lookup
    pub fn resolve(&self, track: Track) -> TempoResolver {
        let (pending, resolver) = PendingTempo::new(track);

        if let Err(err) = self.scheduler.schedule(pending) {
            let pending = err.into_inner();
            let reason = format!("tempo service shut down before track {} was scheduled", pending.track.id);
            pending.promise.resolve(Err(TempoError::Abandoned(reason)));
        }

        resolver
    }

    /// Finish every accepted track and stop the scheduler
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
