// src/config.rs

//! Configuration types for the leaky bucket

// dependencies
use crate::errors::LeakyBucketError;
use std::time::Duration;

/// Configuration for leaky bucket behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakyBucketConfig {
    pub(crate) capacity: usize,
    pub(crate) leak_interval: Duration,
}

impl LeakyBucketConfig {
    /// Create a new configuration with capacity and leak interval settings
    pub fn new(capacity: usize, leak_interval: Duration) -> Self {
        Self {
            capacity,
            leak_interval,
        }
    }

    /// Builder-style: set capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Builder-style: set the interval between leaks
    pub fn leak_interval(mut self, leak_interval: Duration) -> Self {
        self.leak_interval = leak_interval;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LeakyBucketError> {
        if self.capacity < 1 {
            return Err(LeakyBucketError::InvalidCapacity);
        }
        if self.leak_interval.is_zero() {
            return Err(LeakyBucketError::InvalidLeakInterval);
        }
        Ok(())
    }
}

impl Default for LeakyBucketConfig {
    // ten requests, one leak per second
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}
