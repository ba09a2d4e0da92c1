//! Convenient re-exports for common types and traits

pub use crate::core::{Job, JobId, PollStatus, PoolError, Poller, Result};
pub use crate::pool::{ManagerSnapshot, PoolId, PoolManager, PoolManagerConfig, SleepHook};
