// src/drainer.rs

// the background task that leaks one unit out of the bucket per interval

// dependencies
use crate::clock::Clock;
use crate::leaky_bucket::{BucketState, LifecycleState, lock_state};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Periodic leak process bound to a single bucket.
///
/// Active while waiting on the next tick or on cancellation, terminated once
/// the token fires or the bucket is found stopped. The first tick lands one
/// full interval after construction.
///
/// The tick timer is only registered once `run` is polled, so a runtime
/// without timers fails inside the spawned task rather than in the caller.
pub(crate) struct Drainer {
    state: Arc<Mutex<BucketState>>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    first_tick: Instant,
    period: Duration,
}

impl Drainer {
    pub(crate) fn new(
        state: Arc<Mutex<BucketState>>,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
        leak_interval: Duration,
    ) -> Self {
        Self {
            state,
            clock,
            cancel,
            first_tick: Instant::now() + leak_interval,
            period: leak_interval,
        }
    }

    pub(crate) async fn run(self) {
        let Drainer {
            state,
            clock,
            cancel,
            first_tick,
            period,
        } = self;

        // panics when the runtime was built without `enable_time`
        let mut ticks = time::interval_at(first_tick, period);
        // a late tick drains one unit, never a burst of the missed ones
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(?period, "drainer started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticks.tick() => {
                    if leak(&state, clock.as_ref()).is_break() {
                        break;
                    }
                }
            }
        }
        debug!("drainer terminated");
    }
}

// one read-modify-write under the lock; logging happens after release
fn leak(state: &Mutex<BucketState>, clock: &dyn Clock) -> ControlFlow<()> {
    let now = clock.now();
    let level = {
        let mut state = lock_state(state);
        if state.lifecycle == LifecycleState::Stopped {
            return ControlFlow::Break(());
        }
        state.level = state.level.saturating_sub(1);
        if let Ok(nanos) = now.as_ref() {
            state.last_leak_nanos = *nanos;
        }
        state.level
    };

    match now {
        Ok(_) => trace!(level, "leaked one unit"),
        Err(err) => warn!(error = %err, level, "leak applied without updating last leak time"),
    }
    ControlFlow::Continue(())
}
