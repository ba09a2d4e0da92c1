//! Job type and the poll contract

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of a single poll of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollStatus {
    /// The job is still live and wants to be polled again
    Continue,
    /// The job is finished and should be retired
    Stop,
}

/// Advances a job by one step.
///
/// Polls run synchronously on the thread of the pool that currently owns the
/// job. They are expected to return quickly: a blocking poll stalls every
/// other job seated in the same pool for that iteration.
pub trait Poller: Send {
    /// Advance the job one step and report whether it wants to be polled again
    fn poll(&mut self) -> PollStatus;

    /// Get the job's type name for debugging and logging
    fn name(&self) -> &str {
        "Job"
    }
}

impl<F> Poller for F
where
    F: FnMut() -> PollStatus + Send,
{
    fn poll(&mut self) -> PollStatus {
        self()
    }
}

/// Callback run once when a job retires
pub type DestroyFn = Box<dyn FnOnce() + Send>;

/// Process-unique identifier of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct JobId(u64);

impl JobId {
    fn next() -> Self {
        JobId(NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Poller that owns an opaque payload and hands it to a poll function
struct PayloadPoller<T, F> {
    payload: T,
    poll_fn: F,
}

impl<T, F> Poller for PayloadPoller<T, F>
where
    T: Send,
    F: FnMut(&mut T) -> PollStatus + Send,
{
    fn poll(&mut self) -> PollStatus {
        (self.poll_fn)(&mut self.payload)
    }
}

/// A unit of work polled repeatedly until it reports [`PollStatus::Stop`].
///
/// A job is owned by exactly one container at a time: the manager's pending
/// queue or a single pool slot. It moves between them by value, and retiring it
/// consumes it, so it can never be polled again after `Stop` and its destroy
/// callback can run at most once.
pub struct Job {
    id: JobId,
    name: Option<String>,
    poller: Option<Box<dyn Poller>>,
    on_destroy: Option<DestroyFn>,
}

impl Job {
    /// Create a job driven by the given poller
    pub fn new<P: Poller + 'static>(poller: P) -> Self {
        Self {
            id: JobId::next(),
            name: None,
            poller: Some(Box::new(poller)),
            on_destroy: None,
        }
    }

    /// Create a job from an opaque payload and a poll function.
    ///
    /// The pool never touches the payload; only `poll_fn` sees it.
    pub fn with_payload<T, F>(payload: T, poll_fn: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(&mut T) -> PollStatus + Send + 'static,
    {
        Self::new(PayloadPoller { payload, poll_fn })
    }

    /// Create a job with no poll function. It is retired on first encounter.
    pub fn without_poll() -> Self {
        Self {
            id: JobId::next(),
            name: None,
            poller: None,
            on_destroy: None,
        }
    }

    /// Attach a callback that runs once, when the job retires
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn on_destroy<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_destroy = Some(Box::new(callback));
        self
    }

    /// Override the name reported in logs
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Job identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Name used in logs
    pub fn name(&self) -> &str {
        match (&self.name, &self.poller) {
            (Some(name), _) => name,
            (None, Some(poller)) => poller.name(),
            (None, None) => "Job",
        }
    }

    /// Whether the job has a poll function
    pub fn has_poller(&self) -> bool {
        self.poller.is_some()
    }

    /// Poll the job once. A job without a poll function reports `Stop`.
    pub(crate) fn poll(&mut self) -> PollStatus {
        match self.poller.as_mut() {
            Some(poller) => poller.poll(),
            None => PollStatus::Stop,
        }
    }

    /// Run the destroy callback, if any, and discard the job
    pub(crate) fn retire(mut self) {
        if let Some(callback) = self.on_destroy.take() {
            callback();
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("has_poller", &self.poller.is_some())
            .field("has_on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}
