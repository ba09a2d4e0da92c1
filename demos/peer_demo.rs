//! Elastic pool demonstration
//!
//! Keeps up to 20 jobs alive. Each job prints its payload on every poll and
//! stops with a 1 in 100 chance, so pools grow, consolidate and retire as the
//! population churns.
//!
//! Run with: RUST_LOG=elastic_pool=debug,peer_demo=info cargo run --example peer_demo

use elastic_pool::prelude::*;
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

const MAX_JOBS: usize = 20;
const RUN_FOR: Duration = Duration::from_secs(20);

fn do_work(value: &mut u32) -> PollStatus {
    println!("{}", value);

    if rand::thread_rng().gen_range(1..=100) == 5 {
        return PollStatus::Stop;
    }
    PollStatus::Continue
}

fn do_sleep(interval: Duration) {
    thread::sleep(interval);
}

fn main() -> Result<()> {
    env_logger::init();

    let manager = PoolManager::new();
    manager.set_poll_interval(Duration::from_millis(500))?;
    manager.set_sleep_hook(do_sleep);
    manager.set_capacity(10)?;

    let started = Instant::now();
    while started.elapsed() < RUN_FOR {
        if manager.active_job_count() + manager.pending_len() < MAX_JOBS {
            let payload: u32 = rand::thread_rng().gen();
            manager.add(Job::with_payload(payload, do_work))?;
        }

        log::info!(
            "Jobs: {} | Pools: {}",
            manager.active_job_count(),
            manager.pool_count()
        );

        thread::sleep(Duration::from_millis(300));
    }

    log::info!("no more jobs, waiting for pools to drain");
    if !manager.wait_idle(Duration::from_secs(120)) {
        log::warn!("pools still busy: {:?}", manager.snapshot());
    }

    let stats = manager.stats();
    println!(
        "submitted: {}, retired: {}, migrations: {}, pools spawned: {}",
        stats.get_jobs_submitted(),
        stats.get_jobs_retired(),
        stats.get_migrations(),
        stats.get_pools_spawned()
    );

    Ok(())
}
