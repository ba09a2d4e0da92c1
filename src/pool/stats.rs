//! Counters for worker pools and the manager, plus serializable snapshots.

use crate::pool::worker::PoolId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for a single worker pool
#[derive(Debug, Default)]
pub struct PoolStats {
    polls: AtomicU64,
    jobs_seated: AtomicU64,
    jobs_retired: AtomicU64,
    migrated_in: AtomicU64,
    migrated_out: AtomicU64,
}

impl PoolStats {
    /// Create new pool statistics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_seated(&self) {
        self.jobs_seated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retired(&self) {
        self.jobs_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_migrated_in(&self) {
        self.migrated_in.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_migrated_out(&self) {
        self.migrated_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Total number of polls performed by this pool
    pub fn get_polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    /// Jobs this pool took from the pending queue
    pub fn get_jobs_seated(&self) -> u64 {
        self.jobs_seated.load(Ordering::Relaxed)
    }

    /// Jobs that reported `Stop` in this pool
    pub fn get_jobs_retired(&self) -> u64 {
        self.jobs_retired.load(Ordering::Relaxed)
    }

    /// Jobs moved into this pool from another pool
    pub fn get_migrated_in(&self) -> u64 {
        self.migrated_in.load(Ordering::Relaxed)
    }

    /// Jobs moved out of this pool into another pool
    pub fn get_migrated_out(&self) -> u64 {
        self.migrated_out.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            polls: self.get_polls(),
            jobs_seated: self.get_jobs_seated(),
            jobs_retired: self.get_jobs_retired(),
            migrated_in: self.get_migrated_in(),
            migrated_out: self.get_migrated_out(),
        }
    }
}

/// Plain copy of [`PoolStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatsSnapshot {
    /// Total polls
    pub polls: u64,
    /// Jobs taken from the pending queue
    pub jobs_seated: u64,
    /// Jobs retired
    pub jobs_retired: u64,
    /// Jobs received through migration
    pub migrated_in: u64,
    /// Jobs handed off through migration
    pub migrated_out: u64,
}

/// Manager-wide counters. These outlive individual pools.
#[derive(Debug, Default)]
pub struct ManagerStats {
    jobs_submitted: AtomicU64,
    jobs_retired: AtomicU64,
    migrations: AtomicU64,
    pools_spawned: AtomicU64,
    pools_retired: AtomicU64,
}

impl ManagerStats {
    /// Create new manager statistics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submitted(&self) {
        self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retired(&self) {
        self.jobs_retired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_migration(&self) {
        self.migrations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pool_spawned(&self) {
        self.pools_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pool_retired(&self) {
        self.pools_retired.fetch_add(1, Ordering::Relaxed);
    }

    /// Jobs accepted by `add`
    pub fn get_jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Jobs that reported `Stop`
    pub fn get_jobs_retired(&self) -> u64 {
        self.jobs_retired.load(Ordering::Relaxed)
    }

    /// Jobs moved between pools
    pub fn get_migrations(&self) -> u64 {
        self.migrations.load(Ordering::Relaxed)
    }

    /// Pools created so far
    pub fn get_pools_spawned(&self) -> u64 {
        self.pools_spawned.load(Ordering::Relaxed)
    }

    /// Pools that emptied out and deregistered
    pub fn get_pools_retired(&self) -> u64 {
        self.pools_retired.load(Ordering::Relaxed)
    }
}

/// State of one live pool at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    /// Pool identifier
    pub id: PoolId,
    /// Number of slots
    pub capacity: usize,
    /// Occupied slots
    pub occupancy: usize,
    /// Pool counters
    pub stats: PoolStatsSnapshot,
}

/// State of the whole manager at snapshot time.
///
/// Pools are read one after another, so the totals are not transactionally
/// consistent with concurrent seating, migration or retirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerSnapshot {
    /// Live pools in registry order
    pub pools: Vec<PoolSnapshot>,
    /// Jobs waiting for a slot
    pub pending: usize,
    /// Jobs accepted by `add`
    pub jobs_submitted: u64,
    /// Jobs retired
    pub jobs_retired: u64,
    /// Jobs moved between pools
    pub migrations: u64,
    /// Pools created so far
    pub pools_spawned: u64,
    /// Pools retired so far
    pub pools_retired: u64,
}

impl ManagerSnapshot {
    /// Seated jobs across all pools
    pub fn active_jobs(&self) -> usize {
        self.pools.iter().map(|p| p.occupancy).sum()
    }
}
