//! Core types and traits for the elastic pool

pub mod error;
pub mod job;

pub use error::{PoolError, Result};
pub use job::{DestroyFn, Job, JobId, PollStatus, Poller};
