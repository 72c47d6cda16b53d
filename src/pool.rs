// src/pool.rs

//! Bounded-concurrency worker pool.
//!
//! [`WorkerPool`] runs queued jobs with at most `max_concurrent` in flight,
//! each in its own tokio task. The pool starts idle: queued jobs wait until
//! [`start`](WorkerPool::start) is called, and dispatch can be paused and
//! resumed at any time (in-flight jobs always run to completion). Lifecycle
//! transitions and job failures are published through the pool's
//! [`Notifier`].

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::notify::Notifier;

type JobFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Handle identifying a queued job, usable with [`WorkerPool::remove`]
/// while the job is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

/// Lifecycle and failure events published by a [`WorkerPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    Started,
    Paused,
    Resumed,
    /// The queue drained with nothing left executing.
    Finished,
    JobFailed { id: JobId, error: String },
}

/// Dispatch state of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    /// Not started yet; queued jobs wait.
    Idle,
    /// Dispatching jobs up to the concurrency limit.
    Running,
    /// Dispatch suspended; in-flight jobs run to completion.
    Paused,
}

/// Construction options for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub name: String,
    /// Maximum number of jobs in flight; clamped to at least 1.
    pub max_concurrent: usize,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_concurrent: 1,
        }
    }
}

struct Job {
    id: JobId,
    run: JobFn,
}

/// Named job pool with a concurrency bound, pause/resume, progress
/// reporting and lifecycle events.
///
/// Cloning is cheap and shares the same queue. Jobs are spawned onto the
/// ambient tokio runtime, so the pool must be driven from within one.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    options: PoolOptions,
    core: Mutex<PoolCore>,
    events: Notifier<PoolEvent>,
}

struct PoolCore {
    state: PoolState,
    pending: VecDeque<Job>,
    executing: usize,
    completed: usize,
    next_id: u64,
}

impl WorkerPool {
    pub fn new(options: PoolOptions) -> Self {
        let options = PoolOptions {
            max_concurrent: options.max_concurrent.max(1),
            ..options
        };
        Self {
            inner: Arc::new(PoolInner {
                options,
                core: Mutex::new(PoolCore {
                    state: PoolState::Idle,
                    pending: VecDeque::new(),
                    executing: 0,
                    completed: 0,
                    next_id: 0,
                }),
                events: Notifier::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    /// The pool's event hub; register handlers for [`PoolEvent`]s here.
    pub fn events(&self) -> &Notifier<PoolEvent> {
        &self.inner.events
    }

    /// Total number of jobs the pool has seen: pending + executing +
    /// completed.
    pub fn len(&self) -> usize {
        let core = self.inner.core.lock();
        core.pending.len() + core.executing + core.completed
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of seen jobs that have completed; 0.0 for an empty pool.
    pub fn progress(&self) -> f64 {
        let core = self.inner.core.lock();
        let total = core.pending.len() + core.executing + core.completed;
        if total == 0 {
            0.0
        } else {
            core.completed as f64 / total as f64
        }
    }

    /// Enqueue a job at the back of the queue.
    pub fn push<F, Fut>(&self, job: F) -> JobId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.enqueue(job, false)
    }

    /// Enqueue a job at the front of the queue.
    pub fn push_front<F, Fut>(&self, job: F) -> JobId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.enqueue(job, true)
    }

    /// Drop a still-pending job. Returns false if the job is unknown,
    /// already executing, or completed.
    pub fn remove(&self, id: JobId) -> bool {
        let mut core = self.inner.core.lock();
        match core.pending.iter().position(|job| job.id == id) {
            Some(pos) => {
                core.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Begin (or, from paused, also resume) dispatching jobs.
    pub fn start(&self) {
        {
            let mut core = self.inner.core.lock();
            if core.state == PoolState::Running {
                return;
            }
            core.state = PoolState::Running;
        }
        debug!(pool = %self.name(), "pool started");
        self.inner.events.emit(&PoolEvent::Started);
        self.pump();
    }

    /// Suspend dispatch of further jobs; in-flight jobs run to completion.
    pub fn pause(&self) {
        {
            let mut core = self.inner.core.lock();
            if core.state == PoolState::Paused {
                return;
            }
            core.state = PoolState::Paused;
        }
        debug!(pool = %self.name(), "pool paused");
        self.inner.events.emit(&PoolEvent::Paused);
    }

    /// Resume a paused pool.
    pub fn resume(&self) {
        {
            let mut core = self.inner.core.lock();
            if core.state != PoolState::Paused {
                return;
            }
            core.state = PoolState::Running;
        }
        debug!(pool = %self.name(), "pool resumed");
        self.inner.events.emit(&PoolEvent::Resumed);
        self.pump();
    }

    fn enqueue<F, Fut>(&self, job: F, front: bool) -> JobId
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let run: JobFn = Box::new(move || job().boxed());
        let id = {
            let mut core = self.inner.core.lock();
            let id = JobId(core.next_id);
            core.next_id += 1;
            let job = Job { id, run };
            if front {
                core.pending.push_front(job);
            } else {
                core.pending.push_back(job);
            }
            id
        };
        self.pump();
        id
    }

    /// Fill spare capacity with pending jobs; called after every enqueue,
    /// state change and job completion.
    fn pump(&self) {
        loop {
            let job = {
                let mut core = self.inner.core.lock();
                if core.state != PoolState::Running {
                    return;
                }
                if core.executing >= self.inner.options.max_concurrent {
                    return;
                }
                match core.pending.pop_front() {
                    None => {
                        if core.executing == 0 {
                            drop(core);
                            debug!(pool = %self.name(), "pool drained");
                            self.inner.events.emit(&PoolEvent::Finished);
                        }
                        return;
                    }
                    Some(job) => {
                        core.executing += 1;
                        job
                    }
                }
            };

            let pool = self.clone();
            tokio::spawn(async move {
                let id = job.id;
                if let Err(err) = (job.run)().await {
                    warn!(pool = %pool.name(), job = ?id, error = %err, "pool job failed");
                    pool.inner.events.emit(&PoolEvent::JobFailed {
                        id,
                        error: err.to_string(),
                    });
                }
                {
                    let mut core = pool.inner.core.lock();
                    core.executing -= 1;
                    core.completed += 1;
                }
                pool.pump();
            });
        }
    }
}
