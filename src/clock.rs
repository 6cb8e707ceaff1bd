// src/clock.rs

// clock module definition and implementations

// dependencies
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Clock trait to abstract wall-clock time retrieval.
/// Implementors must be thread-safe (Send + Sync).
/// The `now` method returns the current time in nanoseconds since the Unix epoch.
/// The bucket uses it to stamp the last leak, and the HTTP layer to stamp metrics.
/// Drain timing itself is driven by the tokio timer, not by this clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<u64, ClockError>;
}

// shared clocks are clocks too, so one clock can feed every bucket a handle builds
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Result<u64, ClockError> {
        (**self).now()
    }
}

/// Clock error type
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("system time is before the unix epoch")]
    SystemTimeError,
}

/// SystemClock implementation using the system time.
/// Returns the current time in nanoseconds since the Unix epoch.
/// This is the default clock used by `LeakyBucket::new`.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<u64, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .map_err(|_| ClockError::SystemTimeError)
    }
}
