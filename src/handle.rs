// src/handle.rs

//! Application-scoped owner of the active bucket.
//!
//! Reconfiguration builds a fresh bucket, swaps it in and stops the old one,
//! all while holding the handle's write lock. The new drainer's first tick is
//! a full interval away, so the two drainers never both leak, and the old
//! drainer is cancelled before any caller can observe the new bucket.
//! Once the handle is shut down it refuses further reconfiguration.

// dependencies
use crate::clock::{Clock, SystemClock};
use crate::config::LeakyBucketConfig;
use crate::errors::LeakyBucketError;
use crate::leaky_bucket::{BucketStatus, LeakyBucket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Holds the current `LeakyBucket` and replaces it on reconfiguration.
pub struct LimiterHandle {
    active: RwLock<Arc<LeakyBucket>>,
    // only written while holding the `active` write lock
    closed: AtomicBool,
    clock: Arc<dyn Clock>,
}

impl LimiterHandle {
    /// Create a handle whose buckets use the system clock.
    pub fn new(config: LeakyBucketConfig) -> Result<Self, LeakyBucketError> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a handle and its first bucket.
    pub fn with_clock<C>(config: LeakyBucketConfig, clock: C) -> Result<Self, LeakyBucketError>
    where
        C: Clock + 'static,
    {
        let clock: Arc<dyn Clock> = Arc::new(clock);
        let bucket = LeakyBucket::with_config(config, Arc::clone(&clock))?;
        Ok(Self {
            active: RwLock::new(Arc::new(bucket)),
            closed: AtomicBool::new(false),
            clock,
        })
    }

    /// The bucket currently receiving traffic.
    pub fn current(&self) -> Arc<LeakyBucket> {
        Arc::clone(&self.active.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn allow(&self) -> bool {
        self.current().allow()
    }

    pub fn status(&self) -> BucketStatus {
        self.current().status()
    }

    /// Replace the active bucket with one built from `config`.
    ///
    /// # Errors
    ///
    /// An invalid config is rejected before anything is swapped; the active
    /// bucket keeps running untouched. After `shutdown` every call fails
    /// with `LeakyBucketError::Closed` and the freshly built bucket is dropped.
    pub fn reconfigure(&self, config: LeakyBucketConfig) -> Result<(), LeakyBucketError> {
        let replacement = Arc::new(LeakyBucket::with_config(
            config.clone(),
            Arc::clone(&self.clock),
        )?);

        let previous = {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            if self.closed.load(Ordering::Acquire) {
                replacement.stop();
                return Err(LeakyBucketError::Closed);
            }
            let previous = std::mem::replace(&mut *active, replacement);
            previous.stop();
            previous
        };

        info!(
            old_capacity = previous.capacity(),
            old_leak_interval = ?previous.leak_interval(),
            capacity = config.capacity,
            leak_interval = ?config.leak_interval,
            "leaky bucket reconfigured"
        );
        Ok(())
    }

    /// Stop the active bucket and wait for its drainer to exit.
    /// The handle stays readable but cannot be reconfigured afterwards.
    pub async fn shutdown(&self) {
        let active = {
            let active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            self.closed.store(true, Ordering::Release);
            Arc::clone(&active)
        };
        active.shutdown().await;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for LimiterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterHandle")
            .field("active", &self.current())
            .finish_non_exhaustive()
    }
}
