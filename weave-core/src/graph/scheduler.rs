//! Job Queue
//!
//! Computations with a scheduler do not re-run at trigger time; the
//! scheduler decides when. The queue here is the usual destination: a
//! scheduler calls [`JobQueue::queue_job`] and the host later calls
//! [`JobQueue::flush`].
//!
//! # Algorithm
//!
//! 1. Jobs land in one of two queues, pre or post. Queueing a job whose id
//!    is already waiting in the same queue is a no-op, so a burst of
//!    triggers collapses into one run.
//! 2. `flush` runs the oldest pre job; once the pre queue is empty it runs
//!    the oldest post job; it repeats until both are empty. Jobs queued
//!    while flushing run in the same flush.
//! 3. A job that keeps re-queueing itself is cut off after `limit` runs
//!    and the flush fails.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{ReactiveError, Result};
use crate::reactive::SubscriberId;

/// A unit of deferred work.
#[derive(Clone)]
pub struct Job {
    id: SubscriberId,
    run: Rc<dyn Fn()>,
}

impl Job {
    pub fn new<F>(id: SubscriberId, run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self { id, run: Rc::new(run) }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn run(&self) {
        (self.run)();
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish()
    }
}

/// Two-phase, deduplicating job queue.
#[derive(Default)]
pub struct JobQueue {
    pre: RefCell<IndexMap<SubscriberId, Job>>,
    post: RefCell<IndexMap<SubscriberId, Job>>,
    flushing: Cell<bool>,
}

/// Resets the flushing flag, also on early return.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job for the pre phase. Returns `false` if a job with the
    /// same id is already waiting.
    pub fn queue_job(&self, job: Job) -> bool {
        Self::push(&self.pre, job)
    }

    /// Queue a job for the post phase.
    pub fn queue_post_flush(&self, job: Job) -> bool {
        Self::push(&self.post, job)
    }

    fn push(queue: &RefCell<IndexMap<SubscriberId, Job>>, job: Job) -> bool {
        let mut queue = queue.borrow_mut();
        if queue.contains_key(&job.id) {
            return false;
        }
        queue.insert(job.id, job);
        true
    }

    /// Number of jobs waiting in either phase.
    pub fn pending(&self) -> usize {
        self.pre.borrow().len() + self.post.borrow().len()
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    /// Drain both queues. Returns the number of jobs run.
    ///
    /// A flush started from inside a running job returns `Ok(0)`; the
    /// outer flush picks up anything newly queued. If a job runs more
    /// than `limit` times, both queues are discarded and the flush fails.
    pub fn flush(&self, limit: usize) -> Result<usize> {
        if self.flushing.replace(true) {
            return Ok(0);
        }
        let _guard = FlushGuard(&self.flushing);

        let mut runs: HashMap<SubscriberId, usize> = HashMap::new();
        let mut ran = 0;

        while let Some(job) = self.next_job() {
            let count = runs.entry(job.id).or_insert(0);
            *count += 1;
            if *count > limit {
                self.pre.borrow_mut().clear();
                self.post.borrow_mut().clear();
                tracing::warn!(job = ?job.id, limit, "job exceeded recursion limit");
                return Err(ReactiveError::RecursionLimitExceeded { job: job.id, limit });
            }
            job.run();
            ran += 1;
        }

        tracing::debug!(jobs = ran, "flushed job queue");
        Ok(ran)
    }

    fn next_job(&self) -> Option<Job> {
        let pre = self.pre.borrow_mut().shift_remove_index(0);
        if let Some((_, job)) = pre {
            return Some(job);
        }
        self.post.borrow_mut().shift_remove_index(0).map(|(_, job)| job)
    }
}
