// src/lib.rs

//! # Leaky Gate
//!
//! Admission control for an inbound request stream using a leaky bucket: a
//! bounded counter that fills on admitted requests and drains one unit per
//! leak interval from a background tokio task.
//!
//! ## Quick Example
//!
//! ```rust
//! use leaky_gate::{LeakyBucket, LeakyBucketConfig, SystemClock};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = LeakyBucketConfig::new(10, Duration::from_secs(1));
//! let bucket = LeakyBucket::with_config(config, SystemClock).unwrap();
//!
//! if bucket.allow() {
//!     println!("Request allowed");
//! } else {
//!     println!("Rate limited");
//! }
//!
//! let status = bucket.status();
//! println!("{}/{}", status.level, status.capacity);
//! bucket.stop();
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// private modules
mod clock;
mod config;
mod drainer;
mod errors;
mod handle;
mod leaky_bucket;

// public modules
pub mod server;
pub mod stats;
pub mod telemetry;

// public API exports
pub use clock::{Clock, ClockError, SystemClock};
pub use config::LeakyBucketConfig;
pub use errors::{Error, LeakyBucketError};
pub use handle::LimiterHandle;
pub use leaky_bucket::{BucketStatus, LeakyBucket, LifecycleState};

pub type Result<T> = std::result::Result<T, Error>;
