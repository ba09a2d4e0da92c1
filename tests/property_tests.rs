//! Property-based tests for elastic_pool using proptest

use elastic_pool::prelude::*;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn manager(capacity: usize) -> PoolManager {
    PoolManager::with_config(
        PoolManagerConfig::new(capacity).with_poll_interval(Duration::from_millis(2)),
    )
    .unwrap()
}

// ============================================================================
// Configuration Tests
// ============================================================================

proptest! {
    /// Any positive capacity and interval is a valid configuration
    #[test]
    fn test_config_accepts_positive_values(
        capacity in 1usize..64,
        interval_ms in 1u64..1000
    ) {
        let config = PoolManagerConfig::new(capacity)
            .with_poll_interval(Duration::from_millis(interval_ms));

        prop_assert!(config.validate().is_ok());
        let manager = PoolManager::with_config(config).unwrap();
        prop_assert_eq!(manager.capacity(), capacity);
        prop_assert_eq!(manager.poll_interval(), Duration::from_millis(interval_ms));
    }

    /// Capacity can be changed freely until the first pool exists, never after
    #[test]
    fn test_capacity_is_fixed_after_first_pool(
        first in 1usize..16,
        second in 1usize..16
    ) {
        let manager = PoolManager::new();
        prop_assert!(manager.set_capacity(first).is_ok());

        manager.add(Job::without_poll()).unwrap();

        let result = manager.set_capacity(second);
        if first == second {
            prop_assert!(result.is_ok());
        } else {
            let is_locked = matches!(result, Err(PoolError::CapacityLocked { .. }));
            prop_assert!(is_locked);
        }
        prop_assert_eq!(manager.capacity(), first);
    }
}

// ============================================================================
// Job Lifecycle Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Every job is polled exactly as often as it asks for and destroyed once
    #[test]
    fn test_every_job_completes(
        capacity in 1usize..6,
        lifetimes in prop::collection::vec(1usize..12, 1..30)
    ) {
        let manager = manager(capacity);
        let total_polls = Arc::new(AtomicUsize::new(0));
        let destroyed = Arc::new(AtomicUsize::new(0));

        for &lifetime in &lifetimes {
            let total_polls = Arc::clone(&total_polls);
            let destroyed = Arc::clone(&destroyed);
            let mut polls = 0;
            let job = Job::new(move || {
                polls += 1;
                total_polls.fetch_add(1, Ordering::SeqCst);
                if polls == lifetime {
                    PollStatus::Stop
                } else {
                    PollStatus::Continue
                }
            })
            .on_destroy(move || {
                destroyed.fetch_add(1, Ordering::SeqCst);
            });
            manager.add(job).unwrap();
        }

        prop_assert!(manager.wait_idle(TIMEOUT));
        prop_assert_eq!(destroyed.load(Ordering::SeqCst), lifetimes.len());
        prop_assert_eq!(
            total_polls.load(Ordering::SeqCst),
            lifetimes.iter().sum::<usize>()
        );
        prop_assert_eq!(manager.active_job_count(), 0);
    }

    /// Live jobs always fit the pools that hold them
    #[test]
    fn test_pools_cover_live_jobs(
        capacity in 1usize..5,
        job_count in 1usize..20
    ) {
        let manager = manager(capacity);
        let release = Arc::new(AtomicBool::new(false));

        for _ in 0..job_count {
            let release = Arc::clone(&release);
            manager.add(Job::new(move || {
                if release.load(Ordering::SeqCst) {
                    PollStatus::Stop
                } else {
                    PollStatus::Continue
                }
            })).unwrap();
        }

        let deadline = std::time::Instant::now() + TIMEOUT;
        while manager.active_job_count() != job_count && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(2));
        }
        prop_assert_eq!(manager.active_job_count(), job_count);

        let snapshot = manager.snapshot();
        for pool in &snapshot.pools {
            prop_assert!(pool.occupancy <= pool.capacity);
        }
        prop_assert!(snapshot.pools.len() >= job_count.div_ceil(capacity));

        release.store(true, Ordering::SeqCst);
        prop_assert!(manager.wait_idle(TIMEOUT));
    }
}
