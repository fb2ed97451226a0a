//! Bounded offload of blocking work
//!
//! Decode, feature extraction and inference are CPU-bound. They run on
//! tokio's blocking thread pool so the async dispatcher never stalls, and a
//! semaphore caps how many run at once across all in-flight requests.
//!
//! If the awaiting future is dropped, the blocking closure still runs to
//! completion and its result is discarded. The permit moves into the
//! closure, so it is released only when the work actually finishes.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use super::error::PipelineError;

/// Semaphore-gated `spawn_blocking`
#[derive(Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
    max_workers: usize,
}

impl BlockingPool {
    /// Create a pool allowing `max_workers` concurrent jobs (minimum 1)
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Jobs that could start right now without waiting
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the blocking pool and await its result
    pub async fn run<F, T>(&self, stage: &'static str, job: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::Worker(format!("{}: worker pool closed", stage)))?;

        debug!(stage, "Offloading blocking work");
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| PipelineError::Worker(format!("{}: {}", stage, e)))
    }

    /// Stop accepting work; queued and future `run` calls fail
    pub fn close(&self) {
        self.permits.close();
    }
}
