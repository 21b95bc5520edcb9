//! Size- and time-triggered batching of individually scheduled items
//!
//! Producers call [`BatchScheduler::schedule`] one item at a time. A single
//! collector task owns the open batch and closes it when it reaches
//! `batch_size` items or when `max_delay` has passed since its first item,
//! whichever comes first. Because only the collector touches the open batch,
//! every scheduled item lands in exactly one batch.
//!
//! Each closed batch is handed to the handler as its own tracked task, so a
//! slow handler never holds up the next batch or its timer. Handler tasks
//! may overlap and finish in any order.
//!
//! After [`BatchScheduler::shutdown`] (or drop) the scheduler refuses new
//! items with [`ScheduleError::Closed`]. Items already accepted are still
//! dispatched.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Rejected [`BatchScheduler::schedule`] call; carries the item back
pub enum ScheduleError<T> {
    /// The scheduler has been shut down
    Closed(T),
}

impl<T> ScheduleError<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(item) => item,
        }
    }
}

impl<T> fmt::Debug for ScheduleError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for ScheduleError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.write_str("Batch scheduler is shut down"),
        }
    }
}

impl<T> std::error::Error for ScheduleError<T> {}

pub struct BatchScheduler<T> {
    sender: mpsc::UnboundedSender<T>,
    shutdown: CancellationToken,
    handlers: TaskTracker,
    collector: Mutex<Option<JoinHandle<()>>>,
    batch_size: usize,
    max_delay: Duration,
}

impl<T: Send + 'static> BatchScheduler<T> {
    /// Start a scheduler on the current Tokio runtime
    ///
    /// A zero `batch_size` is treated as 1 and a zero `max_delay` as 1ms.
    pub fn new<F, Fut>(batch_size: usize, max_delay: Duration, handler: F) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let batch_size = batch_size.max(1);
        let max_delay = max_delay.max(Duration::from_millis(1));

        let (sender, receiver) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let handlers = TaskTracker::new();

        let collector = tokio::spawn(collect(
            receiver,
            batch_size,
            max_delay,
            handler,
            handlers.clone(),
            shutdown.clone(),
        ));

        Self {
            sender,
            shutdown,
            handlers,
            collector: Mutex::new(Some(collector)),
            batch_size,
            max_delay,
        }
    }

    /// Add `item` to the open batch
    ///
    /// Scheduling on a shut-down scheduler is a usage error; the item is
    /// returned inside the error.
    pub fn schedule(&self, item: T) -> Result<(), ScheduleError<T>> {
        if self.shutdown.is_cancelled() {
            tracing::error!("Item scheduled on a shut-down batch scheduler");
            return Err(ScheduleError::Closed(item));
        }

        self.sender.send(item).map_err(|err| {
            tracing::error!("Item scheduled on a shut-down batch scheduler");
            ScheduleError::Closed(err.0)
        })
    }

    /// Number of handler invocations still running
    pub fn in_flight(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Stop accepting items, dispatch what was already accepted and wait for
    /// every handler invocation to finish
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        if let Some(collector) = self.collector.lock().await.take() {
            if let Err(e) = collector.await {
                tracing::error!(error = %e, "Batch collector task failed");
            }
        }

        self.handlers.close();
        self.handlers.wait().await;
    }
}

impl<T> Drop for BatchScheduler<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn collect<T, F, Fut>(
    mut receiver: mpsc::UnboundedReceiver<T>,
    batch_size: usize,
    max_delay: Duration,
    handler: F,
    handlers: TaskTracker,
    shutdown: CancellationToken,
) where
    T: Send + 'static,
    F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let dispatch = |batch: Vec<T>| {
        tracing::debug!(items = batch.len(), "Dispatching batch");
        handlers.spawn(handler(batch));
    };

    loop {
        let first = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        // The window runs from the batch's first item
        let deadline = tokio::time::sleep_until(Instant::now() + max_delay);
        tokio::pin!(deadline);

        let mut batch = Vec::with_capacity(batch_size);
        batch.push(first);

        while batch.len() < batch_size {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = &mut deadline => break,
                item = receiver.recv() => match item {
                    Some(item) => batch.push(item),
                    None => break,
                },
            }
        }

        dispatch(batch);
    }

    // Drain everything accepted before the channel closed
    receiver.close();
    let mut batch = Vec::with_capacity(batch_size);
    while let Ok(item) = receiver.try_recv() {
        batch.push(item);
        if batch.len() == batch_size {
            dispatch(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
        }
    }
    if !batch.is_empty() {
        dispatch(batch);
    }

    handlers.close();
    tracing::debug!("Batch collector stopped");
}
