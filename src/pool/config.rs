//! Configuration for the pool manager.

use crate::core::{PoolError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default number of job slots per worker pool
pub const DEFAULT_CAPACITY_PER_POOL: usize = 4;

/// Default idle wait between two slot scans
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Replacement for the default timed wait between slot scans.
///
/// Useful to tie pool idling into an application's own tick loop.
pub trait SleepHook: Send + Sync {
    /// Idle for (roughly) the given interval
    fn sleep(&self, interval: Duration);
}

impl<F> SleepHook for F
where
    F: Fn(Duration) + Send + Sync,
{
    fn sleep(&self, interval: Duration) {
        self(interval)
    }
}

/// Configuration for a [`PoolManager`](crate::pool::PoolManager)
///
/// # Example
///
/// ```rust
/// use elastic_pool::prelude::*;
/// use std::time::Duration;
///
/// let config = PoolManagerConfig::new(10)
///     .with_poll_interval(Duration::from_millis(500))
///     .with_sleep_hook(|d: Duration| std::thread::sleep(d))
///     .with_thread_name_prefix("peer-pool");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct PoolManagerConfig {
    /// Maximum number of jobs seated in one worker pool
    pub capacity_per_pool: usize,
    /// Idle wait between two slot scans of a pool.
    /// Default: 100ms
    pub poll_interval: Duration,
    /// Custom idle wait, used instead of `std::thread::sleep` when set
    pub sleep_hook: Option<Arc<dyn SleepHook>>,
    /// Thread name prefix, the pool id is appended
    pub thread_name_prefix: String,
}

impl fmt::Debug for PoolManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManagerConfig")
            .field("capacity_per_pool", &self.capacity_per_pool)
            .field("poll_interval", &self.poll_interval)
            .field("sleep_hook", &self.sleep_hook.as_ref().map(|_| "<custom hook>"))
            .field("thread_name_prefix", &self.thread_name_prefix)
            .finish()
    }
}

impl Default for PoolManagerConfig {
    fn default() -> Self {
        Self {
            capacity_per_pool: DEFAULT_CAPACITY_PER_POOL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sleep_hook: None,
            thread_name_prefix: "pool-worker".to_string(),
        }
    }
}

impl PoolManagerConfig {
    /// Create a new configuration with the given number of slots per pool
    #[must_use]
    pub fn new(capacity_per_pool: usize) -> Self {
        Self {
            capacity_per_pool,
            ..Default::default()
        }
    }

    /// Set the number of slots per pool
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_capacity(mut self, capacity_per_pool: usize) -> Self {
        self.capacity_per_pool = capacity_per_pool;
        self
    }

    /// Set the idle wait between slot scans.
    ///
    /// Shorter intervals lower the latency between a job becoming ready and
    /// being polled, at the cost of CPU time spent scanning.
    ///
    /// # Panics
    ///
    /// Panics if interval is zero.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "poll interval must be non-zero");
        self.poll_interval = interval;
        self
    }

    /// Replace the default timed wait with a custom hook
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_sleep_hook<H: SleepHook + 'static>(mut self, hook: H) -> Self {
        self.sleep_hook = Some(Arc::new(hook));
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity_per_pool)?;
        validate_poll_interval(self.poll_interval)?;
        if self.thread_name_prefix.contains('\0') {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread name prefix must not contain NUL bytes",
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(PoolError::invalid_config(
            "capacity_per_pool",
            "Capacity per pool must be greater than 0",
        ));
    }
    Ok(())
}

pub(crate) fn validate_poll_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(PoolError::invalid_config(
            "poll_interval",
            "Poll interval must be non-zero",
        ));
    }
    Ok(())
}
