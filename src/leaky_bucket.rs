// src/leaky_bucket.rs

// leaky-gate: admission control with a leaky bucket drained by a background task.

// dependencies
use crate::clock::{Clock, SystemClock};
use crate::config::LeakyBucketConfig;
use crate::drainer::Drainer;
use crate::errors::LeakyBucketError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of a bucket. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Stopped,
}

/// Consistent snapshot of a bucket, read under a single lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStatus {
    /// Units currently held in the bucket
    pub level: usize,
    /// Maximum number of units the bucket admits
    pub capacity: usize,
    /// When the drainer last ran (nanoseconds since epoch)
    pub last_leak_nanos: u64,
}

// the single piece of shared mutable state, guarded by one mutex per bucket
#[derive(Debug)]
pub(crate) struct BucketState {
    pub(crate) level: usize,
    pub(crate) last_leak_nanos: u64,
    pub(crate) lifecycle: LifecycleState,
}

// a panic while holding the lock cannot leave the counter torn, so poisoning is ignored
pub(crate) fn lock_state(state: &Mutex<BucketState>) -> MutexGuard<'_, BucketState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The main LeakyBucket model.
/// `allow` fills the bucket one unit per admitted request, a drainer task spawned
/// at construction empties it one unit per leak interval.
/// The bucket stops its drainer when stopped explicitly or when dropped.
#[derive(Debug)]
pub struct LeakyBucket {
    capacity: usize,
    leak_interval: Duration,
    state: Arc<Mutex<BucketState>>,
    stopped: AtomicBool,
    cancel: CancellationToken,
    // held across the join so concurrent `shutdown` calls all wait for the exit
    drainer: AsyncMutex<Option<JoinHandle<()>>>,
}

// methods for the LeakyBucket type
impl LeakyBucket {
    /// Create a bucket driven by the system clock.
    ///
    /// Must be called from within a tokio runtime with timers enabled.
    pub fn new(capacity: usize, leak_interval: Duration) -> Result<Self, LeakyBucketError> {
        Self::with_config(LeakyBucketConfig::new(capacity, leak_interval), SystemClock)
    }

    /// Create a bucket from a config object and start its drainer.
    ///
    /// # Errors
    ///
    /// Returns an error when the config is invalid, when no tokio runtime is
    /// available to host the drainer, or when the clock cannot be read.
    ///
    /// The runtime must have its time driver enabled. Without it the drainer
    /// task panics on its first poll, the bucket never leaks, and `shutdown`
    /// logs the abnormal termination.
    pub fn with_config<C>(config: LeakyBucketConfig, clock: C) -> Result<Self, LeakyBucketError>
    where
        C: Clock + 'static,
    {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| LeakyBucketError::NoRuntime)?;

        let clock: Arc<dyn Clock> = Arc::new(clock);
        let state = Arc::new(Mutex::new(BucketState {
            level: 0,
            last_leak_nanos: clock.now()?,
            lifecycle: LifecycleState::Running,
        }));
        let cancel = CancellationToken::new();

        let drainer = Drainer::new(
            Arc::clone(&state),
            clock,
            cancel.clone(),
            config.leak_interval,
        );
        let task = runtime.spawn(drainer.run());

        debug!(
            capacity = config.capacity,
            leak_interval = ?config.leak_interval,
            "leaky bucket started"
        );

        Ok(Self {
            capacity: config.capacity,
            leak_interval: config.leak_interval,
            state,
            stopped: AtomicBool::new(false),
            cancel,
            drainer: AsyncMutex::new(Some(task)),
        })
    }

    // accessor method to return the capacity field
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // accessor method to return the leak interval field
    pub fn leak_interval(&self) -> Duration {
        self.leak_interval
    }

    /// Admission test-and-increment.
    ///
    /// Returns `false` without touching the level when the bucket is full,
    /// otherwise takes one unit and returns `true`. Never blocks beyond the
    /// counter's critical section and never queues.
    pub fn allow(&self) -> bool {
        let mut state = lock_state(&self.state);
        if state.level >= self.capacity {
            return false;
        }
        state.level += 1;
        true
    }

    /// Snapshot of level and capacity taken under one lock acquisition.
    pub fn status(&self) -> BucketStatus {
        let state = lock_state(&self.state);
        BucketStatus {
            level: state.level,
            capacity: self.capacity,
            last_leak_nanos: state.last_leak_nanos,
        }
    }

    pub fn lifecycle(&self) -> LifecycleState {
        lock_state(&self.state).lifecycle
    }

    /// Signal the drainer to terminate.
    ///
    /// Only the first call has an effect and returns `true`; later calls are
    /// no-ops returning `false`. Once this returns, the level is never
    /// decremented again. Does not wait for the task to exit, see `shutdown`.
    pub fn stop(&self) -> bool {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        lock_state(&self.state).lifecycle = LifecycleState::Stopped;
        self.cancel.cancel();
        debug!(capacity = self.capacity, "leaky bucket stopped");
        true
    }

    /// Stop the bucket and wait until its drainer task has exited.
    ///
    /// Safe to call concurrently: every caller returns only after the task
    /// is gone.
    pub async fn shutdown(&self) {
        self.stop();
        let mut drainer = self.drainer.lock().await;
        if let Some(task) = drainer.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "drainer task terminated abnormally");
            }
        }
    }
}

impl Drop for LeakyBucket {
    fn drop(&mut self) {
        self.stop();
    }
}
