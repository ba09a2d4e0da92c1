//! Holding area for jobs that have not been seated in a pool yet.

use crate::core::Job;
use parking_lot::Mutex;

/// Jobs awaiting a slot.
///
/// Served LIFO: the most recently submitted job is seated first. Every push and
/// pop holds the lock for the single-element mutation only.
#[derive(Debug, Default)]
pub struct PendingQueue {
    jobs: Mutex<Vec<Job>>,
}

impl PendingQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a job
    pub fn push(&self, job: Job) {
        self.jobs.lock().push(job);
    }

    /// Pop the most recently pushed job
    pub fn pop(&self) -> Option<Job> {
        self.jobs.lock().pop()
    }

    /// Number of waiting jobs (approximate once the lock is released)
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether no job is waiting
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PollStatus;

    #[test]
    fn test_pop_is_lifo() {
        let queue = PendingQueue::new();
        let a = Job::new(|| PollStatus::Stop);
        let b = Job::new(|| PollStatus::Stop);
        let c = Job::new(|| PollStatus::Stop);
        let (ida, idb, idc) = (a.id(), b.id(), c.id());

        queue.push(a);
        queue.push(b);
        queue.push(c);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.pop().map(|j| j.id()), Some(idc));
        assert_eq!(queue.pop().map(|j| j.id()), Some(idb));
        assert_eq!(queue.pop().map(|j| j.id()), Some(ida));
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }
}
