//! Pool manager: pending queue, pool registry and the growth policy

use crate::core::{Job, JobId, PollStatus, PoolError, Result};
use crate::pool::config::{validate_capacity, validate_poll_interval, PoolManagerConfig, SleepHook};
use crate::pool::pending::PendingQueue;
use crate::pool::stats::{ManagerSnapshot, ManagerStats};
use crate::pool::worker::{PoolId, WorkerPool};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Live pools in creation order, plus the per-pool capacity they were built with
pub(crate) struct Registry {
    pools: Vec<Arc<WorkerPool>>,
    capacity: usize,
    /// Set once the first pool is created; capacity is fixed from then on
    sealed: bool,
}

impl Registry {
    fn new(capacity: usize) -> Self {
        Self {
            pools: Vec::new(),
            capacity,
            sealed: false,
        }
    }

    pub(crate) fn insert(&mut self, pool: Arc<WorkerPool>) {
        self.sealed = true;
        self.pools.push(pool);
    }

    pub(crate) fn remove(&mut self, id: PoolId) {
        self.pools.retain(|pool| pool.id() != id);
    }

    /// Empty slots across live pools
    pub(crate) fn free_slots(&self) -> usize {
        self.pools.iter().map(|pool| pool.free_slots()).sum()
    }

    /// True when the free slots across live pools cannot absorb one more job
    /// on top of what is already pending.
    ///
    /// This intentionally differs from a plain "every pool is full" check,
    /// which it only equals when nothing is pending. Jobs queued faster than
    /// pools seat them would otherwise count free slots that are already
    /// spoken for, and no new pool would start for them.
    fn is_saturated(&self, pending: usize) -> bool {
        self.free_slots() <= pending
    }
}

#[derive(Clone)]
struct IdleSettings {
    interval: Duration,
    hook: Option<Arc<dyn SleepHook>>,
}

/// State shared between the manager handle and every pool thread
pub(crate) struct Shared {
    pub(crate) pending: PendingQueue,
    pub(crate) registry: Mutex<Registry>,
    pub(crate) stats: ManagerStats,
    idle: RwLock<IdleSettings>,
    thread_name_prefix: String,
}

impl Shared {
    pub(crate) fn new(config: &PoolManagerConfig) -> Self {
        Self {
            pending: PendingQueue::new(),
            registry: Mutex::new(Registry::new(config.capacity_per_pool)),
            stats: ManagerStats::new(),
            idle: RwLock::new(IdleSettings {
                interval: config.poll_interval,
                hook: config.sleep_hook.clone(),
            }),
            thread_name_prefix: config.thread_name_prefix.clone(),
        }
    }

    /// Copy of the registry taken under its lock
    pub(crate) fn registry_snapshot(&self) -> Vec<Arc<WorkerPool>> {
        self.registry.lock().pools.clone()
    }

    /// Start a new pool thread and register the pool.
    ///
    /// Called with the registry lock held, so the pool is visible before any
    /// job pushed under the same lock can be seen by it.
    pub(crate) fn spawn_pool(self: &Arc<Self>, registry: &mut Registry) -> Result<PoolId> {
        let pool = Arc::new(WorkerPool::new(PoolId::next(), registry.capacity));
        let pool_id = pool.id();

        let thread_pool = Arc::clone(&pool);
        let thread_shared = Arc::clone(self);
        thread::Builder::new()
            .name(format!("{}-{}", self.thread_name_prefix, pool_id.as_u64()))
            .spawn(move || WorkerPool::run(thread_pool, thread_shared))
            .map_err(|e| {
                log::error!("failed to start {}: {}", pool_id, e);
                PoolError::spawn_with_source(pool_id.as_u64(), "Cannot start pool thread", e)
            })?;

        registry.insert(pool);
        self.stats.record_pool_spawned();
        log::debug!("spawned {} ({} live pools)", pool_id, registry.pools.len());
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_spawned(pool_id.as_u64(), registry.capacity);

        Ok(pool_id)
    }

    /// Wait between two scans. Settings are read fresh each time and no lock
    /// is held while sleeping.
    pub(crate) fn idle_wait(&self) {
        let settings = self.idle.read().clone();
        match settings.hook {
            Some(hook) => hook.sleep(settings.interval),
            None => thread::sleep(settings.interval),
        }
    }
}

/// Elastic pool of polling worker threads.
///
/// Jobs submitted with [`add`](PoolManager::add) wait in a LIFO pending queue
/// until a pool seats them. Each pool owns a fixed number of slots and one
/// thread that polls every seated job once per scan, then idles for the poll
/// interval. A new pool is started whenever the live pools cannot absorb
/// another job; a pool that ends a scan with no jobs (and nothing pending)
/// deregisters itself and its thread exits. While nothing is pending, live
/// jobs are repacked into other pools' free slots so emptied pools can retire.
///
/// The manager runs no thread of its own. Dropping it does not stop running
/// pools: they keep polling until their jobs finish.
///
/// # Example
///
/// ```rust
/// use elastic_pool::prelude::*;
/// use std::time::Duration;
///
/// # fn main() -> Result<()> {
/// let manager = PoolManager::with_config(
///     PoolManagerConfig::new(2).with_poll_interval(Duration::from_millis(5)),
/// )?;
///
/// for i in 0..5u32 {
///     manager.submit(i, |polls_left: &mut u32| {
///         if *polls_left == 0 {
///             PollStatus::Stop
///         } else {
///             *polls_left -= 1;
///             PollStatus::Continue
///         }
///     })?;
/// }
///
/// assert!(manager.wait_idle(Duration::from_secs(5)));
/// assert_eq!(manager.active_job_count(), 0);
/// # Ok(())
/// # }
/// ```
pub struct PoolManager {
    shared: Arc<Shared>,
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("capacity", &self.capacity())
            .field("poll_interval", &self.poll_interval())
            .field("pools", &self.pool_count())
            .field("pending", &self.pending_len())
            .finish()
    }
}

impl Default for PoolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolManager {
    /// Create a manager with default configuration
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new(&PoolManagerConfig::default())),
        }
    }

    /// Create a manager with the given number of slots per pool
    pub fn with_capacity(capacity_per_pool: usize) -> Result<Self> {
        Self::with_config(PoolManagerConfig::new(capacity_per_pool))
    }

    /// Create a manager with custom configuration
    pub fn with_config(config: PoolManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared::new(&config)),
        })
    }

    /// Set capacity, poll interval and sleep hook in one call.
    ///
    /// Nothing is applied if any value is rejected.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` - zero capacity or zero interval
    /// - `PoolError::CapacityLocked` - capacity changed after the first pool was created
    pub fn configure(
        &self,
        capacity_per_pool: usize,
        poll_interval: Duration,
        sleep_hook: Option<Arc<dyn SleepHook>>,
    ) -> Result<()> {
        validate_poll_interval(poll_interval)?;
        self.set_capacity(capacity_per_pool)?;

        let mut idle = self.shared.idle.write();
        idle.interval = poll_interval;
        idle.hook = sleep_hook;
        Ok(())
    }

    /// Change the number of slots per pool.
    ///
    /// Only allowed before the first pool is created. Setting the value that
    /// is already in effect always succeeds.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` - capacity is zero
    /// - `PoolError::CapacityLocked` - a pool has already been created
    pub fn set_capacity(&self, capacity_per_pool: usize) -> Result<()> {
        validate_capacity(capacity_per_pool)?;

        let mut registry = self.shared.registry.lock();
        if registry.capacity == capacity_per_pool {
            return Ok(());
        }
        if registry.sealed {
            return Err(PoolError::capacity_locked(
                registry.capacity,
                capacity_per_pool,
                registry.pools.len(),
            ));
        }
        registry.capacity = capacity_per_pool;
        Ok(())
    }

    /// Change the idle wait between scans. Pools pick it up at their next wait.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` - interval is zero
    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        validate_poll_interval(interval)?;
        self.shared.idle.write().interval = interval;
        Ok(())
    }

    /// Replace the default timed wait with a custom hook
    pub fn set_sleep_hook<H: SleepHook + 'static>(&self, hook: H) {
        self.shared.idle.write().hook = Some(Arc::new(hook));
    }

    /// Go back to `std::thread::sleep` between scans
    pub fn clear_sleep_hook(&self) {
        self.shared.idle.write().hook = None;
    }

    /// Submit a job.
    ///
    /// If the live pools have no free slot left for it, a new pool is created
    /// and its thread started before the job is queued, so there is always a
    /// pool that will eventually seat it. The job then waits in the pending
    /// queue until a pool picks it up.
    ///
    /// # Errors
    ///
    /// - `PoolError::SpawnError` - the thread of a new pool could not be
    ///   started. The job is not queued and is dropped without running its
    ///   destroy callback.
    pub fn add(&self, job: Job) -> Result<JobId> {
        let job_id = job.id();

        let mut registry = self.shared.registry.lock();
        if registry.is_saturated(self.shared.pending.len()) {
            self.shared.spawn_pool(&mut registry)?;
        }
        // Queued before the registry lock is released so no pool can retire
        // between the saturation check and the push.
        self.shared.pending.push(job);
        drop(registry);

        self.shared.stats.record_submitted();
        log::trace!("queued {}", job_id);
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_submission(self.shared.pending.len());

        Ok(job_id)
    }

    /// Submit an opaque payload with the function that polls it.
    ///
    /// Use [`Job::on_destroy`] with [`add`](PoolManager::add) to attach a
    /// destroy callback.
    pub fn submit<T, F>(&self, payload: T, poll_fn: F) -> Result<JobId>
    where
        T: Send + 'static,
        F: FnMut(&mut T) -> PollStatus + Send + 'static,
    {
        self.add(Job::with_payload(payload, poll_fn))
    }

    /// Seated jobs across all live pools.
    ///
    /// Pools are read one after another, so the sum is approximate under
    /// concurrent activity. Jobs still in the pending queue are not counted.
    pub fn active_job_count(&self) -> usize {
        self.shared
            .registry_snapshot()
            .iter()
            .map(|pool| pool.occupancy())
            .sum()
    }

    /// Number of live pools
    pub fn pool_count(&self) -> usize {
        self.shared.registry.lock().pools.len()
    }

    /// Seated jobs in one pool, or `None` once that pool has retired
    pub fn job_count_in_pool(&self, pool_id: PoolId) -> Option<usize> {
        self.shared
            .registry_snapshot()
            .iter()
            .find(|pool| pool.id() == pool_id)
            .map(|pool| pool.occupancy())
    }

    /// Ids of the live pools in registry order
    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.shared
            .registry_snapshot()
            .iter()
            .map(|pool| pool.id())
            .collect()
    }

    /// Jobs waiting for a slot
    pub fn pending_len(&self) -> usize {
        self.shared.pending.len()
    }

    /// Slots per pool
    pub fn capacity(&self) -> usize {
        self.shared.registry.lock().capacity
    }

    /// Current idle wait between scans
    pub fn poll_interval(&self) -> Duration {
        self.shared.idle.read().interval
    }

    /// Manager-wide counters
    pub fn stats(&self) -> &ManagerStats {
        &self.shared.stats
    }

    /// Serializable view of every live pool and the manager counters
    pub fn snapshot(&self) -> ManagerSnapshot {
        let pools = self
            .shared
            .registry_snapshot()
            .iter()
            .map(|pool| pool.snapshot())
            .collect();
        let stats = &self.shared.stats;

        ManagerSnapshot {
            pools,
            pending: self.pending_len(),
            jobs_submitted: stats.get_jobs_submitted(),
            jobs_retired: stats.get_jobs_retired(),
            migrations: stats.get_migrations(),
            pools_spawned: stats.get_pools_spawned(),
            pools_retired: stats.get_pools_retired(),
        }
    }

    /// Wait until nothing is pending and every pool has retired.
    ///
    /// Returns `false` if that did not happen within `timeout`. Nothing is
    /// cancelled either way.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let step = self.poll_interval().min(Duration::from_millis(10));

        loop {
            if self.shared.pending.is_empty() && self.pool_count() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn fast_config(capacity: usize) -> PoolManagerConfig {
        PoolManagerConfig::new(capacity).with_poll_interval(Duration::from_millis(5))
    }

    fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_manager_creation() {
        let manager = PoolManager::new();
        assert_eq!(manager.capacity(), 4);
        assert_eq!(manager.poll_interval(), Duration::from_millis(100));
        assert_eq!(manager.pool_count(), 0);
        assert_eq!(manager.active_job_count(), 0);
        assert_eq!(manager.pending_len(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = PoolManager::with_capacity(0);
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));

        // Thread names cannot hold NUL bytes
        let result =
            PoolManager::with_config(PoolManagerConfig::new(2).with_thread_name_prefix("a\0b"));
        assert!(matches!(result, Err(PoolError::InvalidConfig { .. })));
    }

    #[test]
    fn test_first_add_spawns_pool() {
        let manager = PoolManager::with_config(fast_config(2)).expect("Failed to create manager");
        let release = Arc::new(AtomicBool::new(false));
        let release_clone = Arc::clone(&release);

        manager
            .add(Job::new(move || {
                if release_clone.load(Ordering::SeqCst) {
                    PollStatus::Stop
                } else {
                    PollStatus::Continue
                }
            }))
            .expect("Failed to add job");

        assert_eq!(manager.pool_count(), 1);
        assert!(wait_for(Duration::from_secs(2), || manager.active_job_count() == 1));

        let pool_id = manager.pool_ids()[0];
        assert_eq!(manager.job_count_in_pool(pool_id), Some(1));

        release.store(true, Ordering::SeqCst);
        assert!(manager.wait_idle(Duration::from_secs(2)));
        assert_eq!(manager.job_count_in_pool(pool_id), None);
    }

    #[test]
    fn test_capacity_locked_after_first_pool() {
        let manager = PoolManager::with_config(fast_config(2)).expect("Failed to create manager");
        manager.set_capacity(3).expect("capacity can change before any pool");
        assert_eq!(manager.capacity(), 3);

        manager.add(Job::without_poll()).expect("Failed to add job");

        let err = manager.set_capacity(5).expect_err("capacity must be locked");
        assert!(matches!(
            err,
            PoolError::CapacityLocked {
                current: 3,
                requested: 5,
                ..
            }
        ));
        assert!(manager.set_capacity(3).is_ok());

        // Still locked once every pool has retired.
        assert!(manager.wait_idle(Duration::from_secs(2)));
        assert!(manager.set_capacity(5).is_err());
        assert_eq!(manager.capacity(), 3);
    }

    #[test]
    fn test_configure_applies_all_or_nothing() {
        let manager = PoolManager::new();
        assert!(manager
            .configure(0, Duration::from_millis(20), None)
            .is_err());
        assert_eq!(manager.capacity(), 4);
        assert_eq!(manager.poll_interval(), Duration::from_millis(100));

        let hook: Arc<dyn SleepHook> = Arc::new(|d: Duration| thread::sleep(d));
        manager
            .configure(8, Duration::from_millis(20), Some(hook))
            .expect("Failed to configure");
        assert_eq!(manager.capacity(), 8);
        assert_eq!(manager.poll_interval(), Duration::from_millis(20));

        assert!(manager.set_poll_interval(Duration::ZERO).is_err());
    }

    #[test]
    fn test_sleep_hook_replaces_default_wait() {
        let manager = PoolManager::with_config(fast_config(1)).expect("Failed to create manager");
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_calls_clone = Arc::clone(&hook_calls);
        manager.set_sleep_hook(move |d: Duration| {
            hook_calls_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(d);
        });

        let mut polls = 0;
        manager
            .add(Job::new(move || {
                polls += 1;
                if polls == 3 {
                    PollStatus::Stop
                } else {
                    PollStatus::Continue
                }
            }))
            .expect("Failed to add job");

        assert!(manager.wait_idle(Duration::from_secs(2)));
        assert!(hook_calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_saturation_counts_pending_jobs() {
        let shared = Shared::new(&fast_config(2));
        let mut registry = shared.registry.lock();
        assert!(registry.is_saturated(0));

        registry.insert(Arc::new(WorkerPool::new(PoolId::next(), 2)));
        assert_eq!(registry.free_slots(), 2);
        assert!(!registry.is_saturated(0));
        assert!(!registry.is_saturated(1));
        assert!(registry.is_saturated(2));
    }

    #[test]
    fn test_snapshot_reports_pools() {
        let manager = PoolManager::with_config(fast_config(2)).expect("Failed to create manager");
        let release = Arc::new(AtomicBool::new(false));

        for _ in 0..3 {
            let release = Arc::clone(&release);
            manager
                .add(Job::new(move || {
                    if release.load(Ordering::SeqCst) {
                        PollStatus::Stop
                    } else {
                        PollStatus::Continue
                    }
                }))
                .expect("Failed to add job");
        }

        assert!(wait_for(Duration::from_secs(2), || {
            manager.active_job_count() == 3
        }));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.active_jobs(), 3);
        assert_eq!(snapshot.pending, 0);
        assert_eq!(snapshot.jobs_submitted, 3);
        assert!(snapshot.pools.len() >= 2);
        assert!(snapshot.pools.iter().all(|p| p.occupancy <= p.capacity));

        release.store(true, Ordering::SeqCst);
        assert!(manager.wait_idle(Duration::from_secs(2)));
        assert_eq!(manager.stats().get_jobs_retired(), 3);
    }
}
