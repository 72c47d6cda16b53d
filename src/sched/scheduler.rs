// src/sched/scheduler.rs

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::errors::SchedulerError;
use crate::sched::registry::{Claim, Registry};
use crate::sched::task::{ExecuteFn, RevertFn};

/// Dependency-aware task orchestrator.
///
/// Holds a registry of named tasks, each declaring zero or more prerequisite
/// task names and a pair of async actions (`execute`, `revert`). Executing a
/// task runs it only once all direct prerequisites have executed, then
/// cascades forward: every dependent whose prerequisites are now satisfied is
/// spawned as an independent tokio task, without being awaited by the
/// triggering call. Reverting a task undoes it and cascades unconditionally
/// to every direct and transitive dependent.
///
/// `T` is the result type produced by execute actions; only the top-level
/// `execute` call observes it, cascaded results are discarded.
///
/// Cloning is cheap and shares the same registry; independent `Scheduler`
/// instances share nothing.
pub struct Scheduler<T = ()> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    registry: Mutex<Registry<T>>,
    /// Number of cascaded executions currently in flight.
    in_flight: AtomicUsize,
    idle: Notify,
}

impl<T> Clone for Scheduler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new()),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Register a task, replacing any existing task of the same name and
    /// discarding the replaced task's state.
    ///
    /// `depends` may reference names that are not yet (or never) registered;
    /// such a task simply stays ineligible until they are registered and
    /// executed. Registrations that would close a dependency cycle among the
    /// currently-registered tasks are rejected without mutating the registry.
    pub fn add<E, EF, R, RF>(
        &self,
        name: &str,
        depends: &[&str],
        execute: E,
        revert: R,
    ) -> Result<(), SchedulerError>
    where
        E: Fn() -> EF + Send + Sync + 'static,
        EF: Future<Output = Result<T>> + Send + 'static,
        R: Fn() -> RF + Send + Sync + 'static,
        RF: Future<Output = Result<()>> + Send + 'static,
    {
        let execute: ExecuteFn<T> = Arc::new(move || execute().boxed());
        let revert: RevertFn = Arc::new(move || revert().boxed());
        let depends: Vec<String> = depends.iter().map(|d| d.to_string()).collect();

        self.inner
            .registry
            .lock()
            .insert(name.to_string(), depends, execute, revert)?;
        debug!(task = %name, "task registered");
        Ok(())
    }

    /// Deregister a task. No-op if the name is unknown.
    ///
    /// Only the removed task's own contributions to the reverse-dependency
    /// index are retracted; entries keyed by the removed task's name (from
    /// other tasks that depend on it) are left intact. If a new task is later
    /// registered under the same name, those entries will cascade onto it.
    pub fn remove(&self, name: &str) {
        if self.inner.registry.lock().remove(name) {
            debug!(task = %name, "task removed");
        } else {
            debug!(task = %name, "remove requested for unknown task; ignoring");
        }
    }

    /// Count of currently registered tasks.
    pub fn size(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Whether the named task has executed since its last reset. False for
    /// unknown names.
    pub fn executed(&self, name: &str) -> bool {
        self.inner.registry.lock().executed(name)
    }

    /// Whether the named task's execute action is currently in flight.
    pub fn running(&self, name: &str) -> bool {
        self.inner.registry.lock().running(name)
    }

    /// Execute the named task and cascade to every dependent that becomes
    /// eligible as a result.
    ///
    /// Returns `Ok(Some(value))` with the task's own result on success.
    /// Returns `Ok(None)` without touching any state when the task is
    /// unknown, its direct prerequisites are not all executed, or it is
    /// already executed or in flight; these conditions are reported via
    /// `tracing` and never abort the caller. If the execute action itself
    /// fails, the failure is returned, `running` is cleared, and `executed`
    /// stays false so a later call may retry; a failed task never triggers
    /// its dependents.
    ///
    /// Cascaded executions run as independent tokio tasks and are not
    /// awaited here; use [`wait_idle`](Self::wait_idle) for a settled point.
    pub async fn execute(&self, name: &str) -> Result<Option<T>> {
        self.run_task(name.to_string()).await
    }

    /// Undo the named task and unconditionally cascade the undo to every
    /// direct and transitive dependent, regardless of their current state.
    ///
    /// The cascade is an explicit FIFO traversal of the reverse-dependency
    /// index: a task's revert action runs before its dependents are visited.
    /// No-op for unknown names. A failing revert action still resets the
    /// task's flags and still cascades; remaining branches are processed and
    /// the first failure is returned once the cascade has completed.
    pub async fn revert(&self, name: &str) -> Result<()> {
        let mut queue = VecDeque::new();
        queue.push_back(name.to_string());
        let mut failure: Option<anyhow::Error> = None;

        while let Some(current) = queue.pop_front() {
            let step = self.inner.registry.lock().begin_revert(&current);
            let Some((revert, epoch)) = step else {
                debug!(task = %current, "revert requested for unknown task; skipping");
                continue;
            };

            debug!(task = %current, "running task revert action");
            let outcome = (*revert)().await;

            {
                let mut registry = self.inner.registry.lock();
                registry.reset(&current, epoch);
                queue.extend(registry.dependents_of(&current).iter().cloned());
            }

            if let Err(err) = outcome {
                warn!(task = %current, error = %err, "task revert action failed");
                if failure.is_none() {
                    failure =
                        Some(err.context(format!("revert action for task '{current}' failed")));
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolve once no cascaded executions are in flight.
    ///
    /// Call after awaiting a top-level [`execute`](Self::execute) to observe
    /// the fully-settled state of the graph.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Claim, run, and settle one task, then spawn its eligible dependents.
    ///
    /// Boxed so cascaded invocations can re-enter through [`spawn_cascade`]
    /// without a recursive future type.
    fn run_task(&self, name: String) -> BoxFuture<'static, Result<Option<T>>> {
        let sched = self.clone();
        Box::pin(async move {
            let claim = sched.inner.registry.lock().claim(&name);
            let (execute, epoch) = match claim {
                Claim::Unknown => {
                    warn!(task = %name, "task execution refused: task does not exist");
                    return Ok(None);
                }
                Claim::Unsatisfied => {
                    warn!(task = %name, "task execution refused: dependencies are not completed");
                    return Ok(None);
                }
                Claim::Settled => {
                    debug!(task = %name, "task already executed or in flight; nothing to do");
                    return Ok(None);
                }
                Claim::Ready { execute, epoch } => (execute, epoch),
            };

            debug!(task = %name, "running task execute action");
            match (*execute)().await {
                Ok(value) => {
                    let ready = sched.inner.registry.lock().complete(&name, epoch);
                    debug!(
                        task = %name,
                        eligible = ready.len(),
                        "task executed; cascading to eligible dependents"
                    );
                    for child in ready {
                        sched.spawn_cascade(child);
                    }
                    Ok(Some(value))
                }
                Err(err) => {
                    sched.inner.registry.lock().release(&name, epoch);
                    Err(err.context(format!("execute action for task '{name}' failed")))
                }
            }
        })
    }

    /// Launch a dependent execution as an independent tokio task. Its result
    /// is discarded; failures are logged.
    fn spawn_cascade(&self, name: String) {
        let sched = self.clone();
        sched.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            if let Err(err) = sched.run_task(name.clone()).await {
                warn!(task = %name, error = %err, "cascaded task execution failed");
            }
            if sched.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                sched.inner.idle.notify_waiters();
            }
        });
    }
}
