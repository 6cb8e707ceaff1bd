// src/errors.rs

// error handling for the leaky gate

// dependencies
use thiserror::Error;

use crate::clock::ClockError;

/// Error type for leaky bucket construction and configuration issues.
/// A rejected request is not an error; `allow` reports it as `false`.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LeakyBucketError {
    #[error("Capacity must be at least 1")]
    InvalidCapacity,
    #[error("Leak interval must be positive")]
    InvalidLeakInterval,
    #[error("No tokio runtime available to run the drainer")]
    NoRuntime,
    #[error("Clock error occurred")]
    ClockError(#[from] ClockError),
    #[error("Limiter has been shut down")]
    Closed,
}

/// Top-level error for the service binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Bucket(#[from] LeakyBucketError),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}
