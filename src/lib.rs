//! # Elastic Pool
//!
//! An elastic pool of worker threads that services long-lived, cooperatively
//! polled jobs. Each job is polled until it reports [`PollStatus::Stop`], and
//! the number of threads follows the load.
//!
//! ## Features
//!
//! - **Worker pools**: fixed-capacity slot arrays, each serviced by one dedicated thread
//! - **Elastic growth**: a new pool is started when the live pools have no room left
//! - **Self-retirement**: a pool that runs out of jobs deregisters itself and its thread exits
//! - **Consolidation**: while nothing is pending, live jobs are repacked into other
//!   pools' free slots so lightly loaded pools can retire
//! - **Introspection**: job and pool counts plus serializable snapshots for telemetry
//!
//! ## Quick Start
//!
//! ```rust
//! use elastic_pool::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let manager = PoolManager::with_config(
//!     PoolManagerConfig::new(4).with_poll_interval(Duration::from_millis(10)),
//! )?;
//!
//! // A job is an opaque payload plus the function that advances it
//! manager.submit(3u32, |remaining: &mut u32| {
//!     if *remaining == 0 {
//!         return PollStatus::Stop;
//!     }
//!     *remaining -= 1;
//!     PollStatus::Continue
//! })?;
//!
//! println!("Jobs: {} | Pools: {}", manager.active_job_count(), manager.pool_count());
//! assert!(manager.wait_idle(Duration::from_secs(5)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Jobs
//!
//! ```rust
//! use elastic_pool::prelude::*;
//!
//! struct Connection {
//!     frames_left: usize,
//! }
//!
//! impl Poller for Connection {
//!     fn poll(&mut self) -> PollStatus {
//!         if self.frames_left == 0 {
//!             return PollStatus::Stop;
//!         }
//!         self.frames_left -= 1;
//!         PollStatus::Continue
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Connection"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let manager = PoolManager::new();
//! let job = Job::new(Connection { frames_left: 2 })
//!     .on_destroy(|| println!("connection closed"));
//! manager.add(job)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Capacity per pool is fixed once the first pool exists; changing it later
//! is reported as [`PoolError::CapacityLocked`]. The poll interval and the
//! sleep hook can change at any time.
//!
//! ```rust
//! use elastic_pool::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let manager = PoolManager::new();
//! manager.set_capacity(10)?;
//! manager.set_poll_interval(Duration::from_millis(500))?;
//! manager.set_sleep_hook(|interval: Duration| std::thread::sleep(interval));
//!
//! manager.add(Job::without_poll())?;
//! assert!(manager.set_capacity(16).is_err());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod tracing;

pub use crate::core::{Job, JobId, PollStatus, PoolError, Poller, Result};
pub use crate::pool::{ManagerSnapshot, PoolId, PoolManager, PoolManagerConfig, SleepHook};
