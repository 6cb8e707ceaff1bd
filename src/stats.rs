// src/stats.rs

// request counters owned by the HTTP layer, independent of any bucket

// dependencies
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals of requests seen on the admission endpoint.
/// Replacing or stopping a bucket never touches these.
#[derive(Debug, Default)]
pub struct RequestStats {
    total: AtomicU64,
    allowed: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub allowed: u64,
    pub rejected: u64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request and its admission outcome.
    pub fn record(&self, admitted: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if admitted {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}
