//! Worker pools and the manager that grows and shrinks them

pub mod config;
pub mod manager;
pub mod pending;
pub mod stats;
pub mod worker;

pub use config::{PoolManagerConfig, SleepHook, DEFAULT_CAPACITY_PER_POOL, DEFAULT_POLL_INTERVAL};
pub use manager::PoolManager;
pub use pending::PendingQueue;
pub use stats::{ManagerSnapshot, ManagerStats, PoolSnapshot, PoolStats, PoolStatsSnapshot};
pub use worker::{PoolId, WorkerPool};
