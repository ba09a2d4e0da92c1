//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled every pool thread runs inside a `pool`
//! span and the manager emits structured events for pool and job lifecycle
//! changes.
//!
//! # Example
//!
//! ```rust,ignore
//! use elastic_pool::prelude::*;
//! use elastic_pool::tracing::TracedPoller;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("elastic_pool=debug".parse().unwrap()))
//!     .init();
//!
//! let manager = PoolManager::new();
//! // Polls run inside the span that was current at submission time
//! manager.add(Job::new(TracedPoller::new(MyPoller::new())))?;
//! ```

use crate::core::{PollStatus, Poller};

/// A poller wrapper that propagates tracing context across thread boundaries.
///
/// The current tracing span is captured when the wrapper is created and
/// entered around every poll, wherever the job has been seated or migrated.
pub struct TracedPoller<P: Poller> {
    inner: P,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<P: Poller> TracedPoller<P> {
    /// Wrap a poller, capturing the current span
    pub fn new(poller: P) -> Self {
        Self {
            inner: poller,
            #[cfg(feature = "tracing")]
            span: tracing::Span::current(),
        }
    }

    /// Wrap a poller with a specific span
    #[cfg(feature = "tracing")]
    pub fn with_span(poller: P, span: tracing::Span) -> Self {
        Self {
            inner: poller,
            span,
        }
    }
}

impl<P: Poller> Poller for TracedPoller<P> {
    fn poll(&mut self) -> PollStatus {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.poll()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Metrics recording functions for observability.
///
/// These emit tracing events that metrics collectors can turn into counters
/// and gauges.
#[cfg(feature = "tracing")]
pub mod metrics {
    /// Records a job submission.
    #[inline]
    pub fn record_submission(pending: usize) {
        tracing::trace!(
            counter.jobs_submitted = 1,
            gauge.pending = pending as i64,
            "job submitted"
        );
    }

    /// Records a job taken from the pending queue.
    #[inline]
    pub fn record_job_seated(pool_id: u64) {
        tracing::trace!(counter.jobs_seated = 1, pool_id = pool_id, "job seated");
    }

    /// Records a job that reported `Stop`.
    #[inline]
    pub fn record_job_retired(pool_id: u64) {
        tracing::trace!(counter.jobs_retired = 1, pool_id = pool_id, "job retired");
    }

    /// Records a live job moved between pools.
    #[inline]
    pub fn record_migration(from_pool: u64, to_pool: u64) {
        tracing::debug!(
            counter.migrations = 1,
            from_pool = from_pool,
            to_pool = to_pool,
            "job migrated"
        );
    }

    /// Records a new pool thread.
    #[inline]
    pub fn record_pool_spawned(pool_id: u64, capacity: usize) {
        tracing::info!(
            gauge.pools = 1,
            pool_id = pool_id,
            capacity = capacity,
            "pool spawned"
        );
    }

    /// Records a pool leaving the registry.
    #[inline]
    pub fn record_pool_retired(pool_id: u64) {
        tracing::info!(gauge.pools = -1i64, pool_id = pool_id, "pool retired");
    }
}
