// src/lib.rs

//! taskdag — dependency-aware task orchestration utilities.
//!
//! The core is [`Scheduler`]: a registry of named tasks with declared
//! prerequisites and paired async execute/revert actions. Executing a task
//! runs it once its direct prerequisites have all executed, then cascades
//! forward through the reverse-dependency index, spawning every newly
//! eligible dependent as an independent tokio task. Reverting a task undoes
//! it and unconditionally cascades the undo to every transitive dependent.
//!
//! Around the scheduler sit a few standalone scheduling utilities:
//! - [`pool`] — bounded-concurrency worker pool with pause/resume
//! - [`notify`] — typed event notification hub
//! - [`history`] — undo/redo action history with branch-redo semantics
//! - [`queue`] — minimal FIFO queue
//! - [`recycle`] — object recycling pool

pub mod errors;
pub mod history;
pub mod logging;
pub mod notify;
pub mod pool;
pub mod queue;
pub mod recycle;
pub mod sched;

pub use errors::SchedulerError;
pub use history::{Action, ActionList, ArcAction, History};
pub use notify::{HandlerId, Notifier};
pub use pool::{JobId, PoolEvent, PoolOptions, WorkerPool};
pub use queue::Queue;
pub use recycle::{Recycler, Reusable};
pub use sched::Scheduler;
