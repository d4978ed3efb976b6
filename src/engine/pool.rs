//! Admission control for engine processes
//!
//! At most `max_concurrent` engines run at once and at most `max_queued`
//! requests wait for a slot. Anything beyond that is rejected immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("All {running} engine slots are busy and {queued} requests are already waiting")]
    Saturated { running: usize, queued: usize },

    #[error("Engine pool is shut down")]
    Closed,
}

/// Held while an engine runs; dropping it frees the slot
pub struct EngineSlot {
    _permit: OwnedSemaphorePermit,
}

#[derive(Debug)]
pub struct EnginePool {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    max_queued: usize,
    waiting: AtomicUsize,
}

/// Decrements the waiter count however the wait ends (acquired, cancelled, closed)
struct WaitGuard<'a>(&'a AtomicUsize);

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EnginePool {
    pub fn new(max_concurrent: usize, max_queued: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            max_queued,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Take a slot, waiting in the bounded queue if all slots are busy
    pub async fn acquire(&self) -> Result<EngineSlot, PoolError> {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => return Ok(EngineSlot { _permit: permit }),
            Err(tokio::sync::TryAcquireError::Closed) => return Err(PoolError::Closed),
            Err(tokio::sync::TryAcquireError::NoPermits) => {}
        }

        let queued = self.waiting.fetch_add(1, Ordering::SeqCst);
        let _guard = WaitGuard(&self.waiting);
        if queued >= self.max_queued {
            log::warn!(
                "Engine pool saturated ({} running, {} waiting)",
                self.max_concurrent,
                queued
            );
            return Err(PoolError::Saturated {
                running: self.max_concurrent,
                queued,
            });
        }

        log::debug!("Waiting for engine slot ({} ahead)", queued);
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map(|permit| EngineSlot { _permit: permit })
            .map_err(|_| PoolError::Closed)
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Reject current waiters and all future requests
    pub fn close(&self) {
        self.semaphore.close();
    }
}
