// tests/ratelimiter/reconfigure_tests.rs

#[cfg(test)]
mod tests {
    use crate::fixtures::test_clock::TestClock;
    use leaky_gate::{LeakyBucketConfig, LeakyBucketError, LifecycleState, LimiterHandle};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    const INTERVAL: Duration = Duration::from_millis(100);

    fn handle(capacity: usize, interval: Duration) -> LimiterHandle {
        let config = LeakyBucketConfig::new(capacity, interval);
        LimiterHandle::with_clock(config, TestClock::new(0.0)).unwrap()
    }

    #[tokio::test]
    async fn handle_delegates_to_active_bucket() {
        let handle = handle(2, Duration::from_secs(60));
        assert!(handle.allow());
        assert!(handle.allow());
        assert!(!handle.allow());

        let status = handle.status();
        assert_eq!(status.level, 2);
        assert_eq!(status.capacity, 2);
    }

    #[tokio::test]
    async fn reconfigure_installs_an_empty_bucket() {
        let handle = handle(2, Duration::from_secs(60));
        assert!(handle.allow());
        assert!(handle.allow());

        handle
            .reconfigure(LeakyBucketConfig::new(5, Duration::from_millis(500)))
            .unwrap();

        let current = handle.current();
        assert_eq!(current.capacity(), 5);
        assert_eq!(current.leak_interval(), Duration::from_millis(500));
        assert_eq!(handle.status().level, 0);
        assert_eq!(current.lifecycle(), LifecycleState::Running);
    }

    #[tokio::test]
    async fn reconfigure_stops_the_previous_bucket() {
        let handle = handle(2, Duration::from_secs(60));
        let previous = handle.current();

        handle
            .reconfigure(LeakyBucketConfig::new(3, Duration::from_secs(1)))
            .unwrap();

        assert_eq!(previous.lifecycle(), LifecycleState::Stopped);
        assert!(!Arc::ptr_eq(&previous, &handle.current()));

        // the old bucket was already stopped, the swap did it exactly once
        assert!(!previous.stop());
    }

    #[tokio::test]
    async fn invalid_config_leaves_active_bucket_in_place() {
        let handle = handle(2, Duration::from_secs(60));
        let before = handle.current();
        assert!(handle.allow());

        let result = handle.reconfigure(LeakyBucketConfig::new(0, Duration::from_secs(1)));
        assert!(matches!(
            result.unwrap_err(),
            LeakyBucketError::InvalidCapacity
        ));

        let result = handle.reconfigure(LeakyBucketConfig::new(4, Duration::ZERO));
        assert!(matches!(
            result.unwrap_err(),
            LeakyBucketError::InvalidLeakInterval
        ));

        assert!(Arc::ptr_eq(&before, &handle.current()));
        assert_eq!(before.lifecycle(), LifecycleState::Running);
        assert_eq!(handle.status().level, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_new_bucket_drains_after_a_swap() {
        let handle = handle(2, INTERVAL);
        let previous = handle.current();
        assert!(handle.allow());
        assert!(handle.allow());

        handle
            .reconfigure(LeakyBucketConfig::new(2, INTERVAL))
            .unwrap();
        assert!(handle.allow());
        assert!(handle.allow());

        sleep(Duration::from_millis(150)).await;

        // old level frozen, new bucket leaked one unit
        assert_eq!(previous.status().level, 2);
        assert_eq!(handle.status().level, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_reconfigurations() {
        let handle = handle(1, INTERVAL);
        let mut retired = Vec::new();

        for capacity in 2..6 {
            retired.push(handle.current());
            handle
                .reconfigure(LeakyBucketConfig::new(capacity, INTERVAL))
                .unwrap();
        }

        assert_eq!(handle.status().capacity, 5);
        assert!(
            retired
                .iter()
                .all(|bucket| bucket.lifecycle() == LifecycleState::Stopped)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn handle_shutdown_stops_active_bucket() {
        let handle = handle(2, INTERVAL);
        assert!(handle.allow());

        handle.shutdown().await;
        assert_eq!(handle.current().lifecycle(), LifecycleState::Stopped);

        sleep(INTERVAL * 5).await;
        assert_eq!(handle.status().level, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_after_shutdown_is_refused() {
        let handle = handle(2, INTERVAL);
        assert!(!handle.is_closed());
        handle.shutdown().await;
        assert!(handle.is_closed());
        let stopped = handle.current();

        let result = handle.reconfigure(LeakyBucketConfig::new(5, INTERVAL));
        assert!(matches!(result.unwrap_err(), LeakyBucketError::Closed));

        // no running bucket was installed behind the shutdown
        assert!(Arc::ptr_eq(&stopped, &handle.current()));
        assert_eq!(handle.status().capacity, 2);
        assert_eq!(handle.current().lifecycle(), LifecycleState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_config_after_shutdown_reports_the_config_error() {
        let handle = handle(2, INTERVAL);
        handle.shutdown().await;

        let result = handle.reconfigure(LeakyBucketConfig::new(0, INTERVAL));
        assert!(matches!(
            result.unwrap_err(),
            LeakyBucketError::InvalidCapacity
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn callers_always_see_a_complete_bucket_during_swaps() {
        let handle = Arc::new(handle(4, Duration::from_secs(60)));

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                tokio::task::spawn_blocking(move || {
                    for _ in 0..2_000 {
                        handle.allow();
                        let status = handle.status();
                        assert!(status.capacity == 4 || status.capacity == 8);
                        assert!(status.level <= status.capacity);
                    }
                })
            })
            .collect();

        for round in 0..50 {
            let capacity = if round % 2 == 0 { 8 } else { 4 };
            handle
                .reconfigure(LeakyBucketConfig::new(capacity, Duration::from_secs(60)))
                .unwrap();
            tokio::task::yield_now().await;
        }

        for caller in callers {
            caller.await.unwrap();
        }
    }
}
