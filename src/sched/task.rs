// src/sched/task.rs

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;

/// Stored execute action: a 0-arg async callback producing the task's result.
pub type ExecuteFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Stored revert action: a 0-arg async callback undoing the task's work.
pub type RevertFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A registered unit of work: declared prerequisites plus a pair of
/// caller-supplied action callbacks and the execution flags.
///
/// Behaviour is attached as two independent callable slots rather than a
/// trait object per task, so a task is plain data the registry owns outright.
pub(crate) struct Task<T> {
    pub name: String,
    /// Direct prerequisites, in declaration order. May reference names that
    /// are not (yet, or ever) registered.
    pub depends: Vec<String>,
    pub execute: ExecuteFn<T>,
    pub revert: RevertFn,
    /// True once the execute action has run to completion since the last
    /// reset (initial registration or a revert).
    pub executed: bool,
    /// True while the execute action is in flight; guards against a second
    /// overlapping invocation of the same task.
    pub running: bool,
    /// Registration stamp. A completion observed with a stale epoch belongs
    /// to a task that was replaced or removed while its action was suspended
    /// and must not touch the current entry.
    pub epoch: u64,
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("depends", &self.depends)
            .field("executed", &self.executed)
            .field("running", &self.running)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}
