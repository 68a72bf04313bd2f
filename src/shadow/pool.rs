//! Bounded pool for background staging tasks.
//!
//! # Responsibilities
//! - Cap concurrent staging work; shed new tasks when the cap is reached
//! - Bound each task by a deadline
//! - Abandon every task cleanly when the process shuts down
//!
//! # Design Decisions
//! - Admission is non-blocking (`try_acquire_owned`); the caller never waits
//! - A task's permit lives exactly as long as the task body
//! - Shutdown drains for a grace period, then cancels what is left

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::StagingPoolConfig;
use crate::observability::metrics;

const MAX_PERMITS: usize = if (u32::MAX as usize) < Semaphore::MAX_PERMITS {
    u32::MAX as usize
} else {
    Semaphore::MAX_PERMITS
};

/// Runs staging tasks with bounded concurrency, a per-task deadline, and
/// cancellation tied to shutdown.
#[derive(Debug)]
pub struct StagingPool {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    deadline: Duration,
    drain: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl StagingPool {
    /// `max_in_flight` is clamped to what one `acquire_many` call can take.
    pub fn new(max_in_flight: usize, deadline: Duration, drain: Duration) -> Self {
        let max_in_flight = max_in_flight.min(MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            deadline,
            drain,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &StagingPoolConfig) -> Self {
        Self::new(
            config.max_in_flight,
            Duration::from_secs(config.deadline_secs),
            Duration::from_secs(config.drain_secs),
        )
    }

    /// Number of staging tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Start `task` in the background.
    ///
    /// Returns `false` when the task was not started, either because the
    /// pool is full or because shutdown has begun.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            metrics::record_staging("cancelled");
            return false;
        }

        let permit = match self.permits.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                metrics::record_staging("shed");
                tracing::debug!(max_in_flight = self.max_in_flight, "Staging pool full, shedding task");
                return false;
            }
        };

        let permits = self.permits.clone();
        let max_in_flight = self.max_in_flight;
        let deadline = self.deadline;
        let cancel = self.cancel.clone();

        metrics::record_staging_in_flight(max_in_flight - permits.available_permits());

        self.tracker.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    metrics::record_staging("cancelled");
                    tracing::debug!("Staging task cancelled by shutdown");
                }
                result = tokio::time::timeout(deadline, task) => {
                    if result.is_err() {
                        metrics::record_staging("timed_out");
                        tracing::warn!(deadline = ?deadline, "Staging task exceeded its deadline");
                    }
                }
            }
            drop(permit);
            metrics::record_staging_in_flight(max_in_flight - permits.available_permits());
        });
        true
    }

    /// Wait until no staging task holds a slot.
    pub async fn wait_idle(&self) {
        // Holding every permit at once means nothing else is running.
        let Ok(count) = u32::try_from(self.max_in_flight) else {
            return;
        };
        if let Ok(all) = self.permits.acquire_many(count).await {
            drop(all);
        }
    }

    /// Stop admitting work, give running tasks the drain period, then cancel
    /// the rest and wait for them to unwind.
    pub async fn shutdown(&self) {
        self.tracker.close();
        let in_flight = self.tracker.len();
        if in_flight > 0 {
            tracing::info!(in_flight, drain = ?self.drain, "Draining staging tasks");
        }

        if tokio::time::timeout(self.drain, self.tracker.wait()).await.is_err() {
            tracing::warn!(
                remaining = self.tracker.len(),
                "Staging drain period elapsed, cancelling remaining tasks"
            );
        }
        self.cancel.cancel();
        self.tracker.wait().await;
    }
}
