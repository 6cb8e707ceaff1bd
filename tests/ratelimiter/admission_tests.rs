// tests/ratelimiter/admission_tests.rs

#[cfg(test)]
mod tests {
    use leaky_gate::LeakyBucket;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    // long enough that nothing drains while a test runs
    const NO_DRAIN: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn three_admitted_then_fourth_rejected() {
        let bucket = LeakyBucket::new(3, NO_DRAIN).unwrap();

        assert!(bucket.allow());
        assert!(bucket.allow());
        assert!(bucket.allow());
        assert_eq!(bucket.status().level, 3);

        // Fourth immediate request is rejected and leaves the level alone
        assert!(!bucket.allow());
        assert_eq!(bucket.status().level, 3);
    }

    #[tokio::test]
    async fn rejection_is_repeatable() {
        let bucket = LeakyBucket::new(1, NO_DRAIN).unwrap();
        assert!(bucket.allow());
        for _ in 0..10 {
            assert!(!bucket.allow());
        }
        assert_eq!(bucket.status().level, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_admit_exactly_capacity() {
        let capacity = 50;
        let extra = 30;
        let callers = capacity + extra;

        let bucket = Arc::new(LeakyBucket::new(capacity, NO_DRAIN).unwrap());
        let barrier = Arc::new(Barrier::new(callers));
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..callers {
                let bucket = Arc::clone(&bucket);
                let barrier = Arc::clone(&barrier);
                let admitted = &admitted;
                scope.spawn(move || {
                    barrier.wait();
                    if bucket.allow() {
                        admitted.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        let admitted = admitted.load(Ordering::Relaxed);
        assert_eq!(admitted, capacity);
        assert_eq!(callers - admitted, extra);
        assert_eq!(bucket.status().level, capacity);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn level_stays_within_bounds_while_draining() {
        let capacity = 8;
        let bucket = Arc::new(LeakyBucket::new(capacity, Duration::from_millis(1)).unwrap());

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                tokio::task::spawn_blocking(move || {
                    for i in 0..5_000 {
                        bucket.allow();
                        if i % 16 == 0 {
                            std::thread::sleep(Duration::from_micros(200));
                        }
                        let status = bucket.status();
                        assert!(status.level <= status.capacity);
                        assert_eq!(status.capacity, capacity);
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.await.unwrap();
        }
        assert!(bucket.status().level <= capacity);
    }
}
