//! Worker pool: a fixed set of job slots serviced by one dedicated thread

use crate::core::{Job, JobId, PollStatus};
use crate::pool::manager::Shared;
use crate::pool::stats::{PoolSnapshot, PoolStats};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::{span, Level};

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a worker pool, valid for introspection until the pool retires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct PoolId(pub(crate) u64);

impl PoolId {
    pub(crate) fn next() -> Self {
        PoolId(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool-{}", self.0)
    }
}

enum Slot {
    Empty,
    Seated(Job),
    /// Job taken out by the owning thread for a poll. Counts as occupied and is
    /// never a migration target.
    Polling(JobId),
}

impl Slot {
    fn job_id(&self) -> Option<JobId> {
        match self {
            Slot::Empty => None,
            Slot::Seated(job) => Some(job.id()),
            Slot::Polling(id) => Some(*id),
        }
    }
}

struct Slots {
    slots: Vec<Slot>,
    occupancy: usize,
    /// Set under the lock when the pool leaves the registry
    closed: bool,
}

/// A fixed-capacity set of job slots serviced by exactly one worker thread.
///
/// The slot array and its occupancy sit behind the pool's own lock. The owning
/// thread takes it for each slot visit, and a thread of another pool takes it
/// while handing a job over during migration. The lock is never held while a
/// poll function or destroy callback runs, and no thread ever holds the slot
/// locks of two pools at once.
pub struct WorkerPool {
    id: PoolId,
    capacity: usize,
    slots: Mutex<Slots>,
    stats: PoolStats,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .field("occupancy", &self.occupancy())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `capacity` empty slots. The thread is started by the manager.
    pub(crate) fn new(id: PoolId, capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Slot::Empty).collect();
        Self {
            id,
            capacity,
            slots: Mutex::new(Slots {
                slots,
                occupancy: 0,
                closed: false,
            }),
            stats: PoolStats::new(),
        }
    }

    /// Pool identifier
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots
    pub fn occupancy(&self) -> usize {
        self.slots.lock().occupancy
    }

    /// Number of empty slots
    pub fn free_slots(&self) -> usize {
        self.capacity - self.occupancy()
    }

    /// Whether every slot is occupied
    pub fn is_saturated(&self) -> bool {
        self.occupancy() == self.capacity
    }

    /// Pool statistics
    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    /// Ids of the seated jobs, in slot order
    pub fn job_ids(&self) -> Vec<JobId> {
        self.slots
            .lock()
            .slots
            .iter()
            .filter_map(Slot::job_id)
            .collect()
    }

    pub(crate) fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            id: self.id,
            capacity: self.capacity,
            occupancy: self.occupancy(),
            stats: self.stats.snapshot(),
        }
    }

    /// Thread body: scan, retire when empty, idle, repeat.
    pub(crate) fn run(pool: Arc<WorkerPool>, shared: Arc<Shared>) {
        #[cfg(feature = "tracing")]
        let pool_span = span!(Level::DEBUG, "pool", id = pool.id.as_u64());
        #[cfg(feature = "tracing")]
        let _guard = pool_span.enter();

        let _teardown = PanicTeardown {
            pool: &*pool,
            shared: &shared,
        };

        log::debug!("{} started with {} slots", pool.id, pool.capacity);

        loop {
            pool.scan(&shared);

            if pool.try_retire(&shared) {
                log::debug!(
                    "{} retired after {} polls ({} jobs retired)",
                    pool.id,
                    pool.stats.get_polls(),
                    pool.stats.get_jobs_retired()
                );
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_pool_retired(pool.id.as_u64());
                return;
            }

            shared.idle_wait();
        }
    }

    /// One full pass over the slots in slot order.
    ///
    /// An empty slot is filled from the pending queue and the new job is polled
    /// in the same visit. A job that stops is destroyed and its slot cleared. A
    /// job that continues is offered to another pool with a free slot, but only
    /// while nothing is pending.
    pub(crate) fn scan(&self, shared: &Shared) {
        for index in 0..self.capacity {
            let Some(mut job) = self.take_for_poll(index, shared) else {
                continue;
            };

            self.stats.record_poll();
            match job.poll() {
                PollStatus::Stop => {
                    let job_id = job.id();
                    job.retire();
                    self.clear_slot(index);
                    self.stats.record_retired();
                    shared.stats.record_retired();
                    log::trace!("{} retired {}", self.id, job_id);
                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_job_retired(self.id.as_u64());
                }
                PollStatus::Continue => match self.try_migrate(job, shared) {
                    Ok(()) => self.clear_slot(index),
                    Err(job) => self.restore(index, job),
                },
            }
        }
    }

    /// Take the job at `index` out for polling, seating one from the pending
    /// queue first if the slot is empty.
    fn take_for_poll(&self, index: usize, shared: &Shared) -> Option<Job> {
        let mut guard = self.slots.lock();
        let slots = &mut *guard;

        match std::mem::replace(&mut slots.slots[index], Slot::Empty) {
            Slot::Seated(job) => {
                slots.slots[index] = Slot::Polling(job.id());
                Some(job)
            }
            Slot::Empty => {
                let job = shared.pending.pop()?;
                slots.slots[index] = Slot::Polling(job.id());
                slots.occupancy += 1;
                self.stats.record_seated();
                log::trace!("{} seated {} in slot {}", self.id, job.id(), index);
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_job_seated(self.id.as_u64());
                Some(job)
            }
            Slot::Polling(id) => {
                slots.slots[index] = Slot::Polling(id);
                None
            }
        }
    }

    fn restore(&self, index: usize, job: Job) {
        self.slots.lock().slots[index] = Slot::Seated(job);
    }

    fn clear_slot(&self, index: usize) {
        let mut slots = self.slots.lock();
        slots.slots[index] = Slot::Empty;
        slots.occupancy -= 1;
    }

    /// Hand a live job to the first other pool with an empty slot.
    ///
    /// Skipped while the pending queue has jobs, so waiting jobs are seated
    /// before live ones are repacked. Gives the job back when no pool takes it.
    fn try_migrate(&self, job: Job, shared: &Shared) -> std::result::Result<(), Job> {
        if !shared.pending.is_empty() {
            return Err(job);
        }

        let mut job = job;
        for target in shared.registry_snapshot() {
            if target.id == self.id {
                continue;
            }
            let job_id = job.id();
            match target.accept(job) {
                Ok(()) => {
                    self.stats.record_migrated_out();
                    shared.stats.record_migration();
                    log::trace!("{} migrated {} to {}", self.id, job_id, target.id);
                    #[cfg(feature = "tracing")]
                    crate::tracing::metrics::record_migration(
                        self.id.as_u64(),
                        target.id.as_u64(),
                    );
                    return Ok(());
                }
                Err(returned) => job = returned,
            }
        }
        Err(job)
    }

    /// Seat a migrating job in the first empty slot
    fn accept(&self, job: Job) -> std::result::Result<(), Job> {
        let mut guard = self.slots.lock();
        let slots = &mut *guard;
        if slots.closed {
            return Err(job);
        }

        match slots.slots.iter().position(|slot| matches!(slot, Slot::Empty)) {
            Some(index) => {
                slots.slots[index] = Slot::Seated(job);
                slots.occupancy += 1;
                self.stats.record_migrated_in();
                Ok(())
            }
            None => Err(job),
        }
    }

    /// Leave the registry if the pool is empty and nothing is pending.
    ///
    /// Lock order is registry, then slots, then pending queue.
    pub(crate) fn try_retire(&self, shared: &Shared) -> bool {
        let mut registry = shared.registry.lock();
        let mut slots = self.slots.lock();
        if slots.occupancy > 0 || !shared.pending.is_empty() {
            return false;
        }

        slots.closed = true;
        registry.remove(self.id);
        shared.stats.record_pool_retired();
        true
    }

    /// Deregister after the thread died mid-scan and return the seated jobs to
    /// the pending queue.
    ///
    /// If the pools left cannot seat everything now pending, a replacement
    /// pool is started under the same registry lock.
    fn abandon(&self, shared: &Arc<Shared>) -> usize {
        let mut registry = shared.registry.lock();
        let orphans: Vec<Job> = {
            let mut slots = self.slots.lock();
            slots.closed = true;
            slots.occupancy = 0;
            registry.remove(self.id);
            let seated: Vec<Job> = slots
                .slots
                .iter_mut()
                .filter_map(|slot| match std::mem::replace(slot, Slot::Empty) {
                    Slot::Seated(job) => Some(job),
                    _ => None,
                })
                .collect();
            seated
        };
        shared.stats.record_pool_retired();

        let count = orphans.len();
        for job in orphans {
            shared.pending.push(job);
        }

        if registry.free_slots() < shared.pending.len() {
            if let Err(e) = shared.spawn_pool(&mut registry) {
                log::error!("no replacement for {}: {}", self.id, e);
            }
        }
        count
    }
}

/// Cleans up after a poll function panics on the pool thread. The panic is not
/// caught; the thread still terminates.
struct PanicTeardown<'a> {
    pool: &'a WorkerPool,
    shared: &'a Arc<Shared>,
}

impl Drop for PanicTeardown<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let requeued = self.pool.abandon(self.shared);
            log::error!(
                "{} terminated by a panicking poll function; {} seated jobs returned to pending",
                self.pool.id,
                requeued
            );
        }
    }
}
