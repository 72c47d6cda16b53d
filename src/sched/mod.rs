// src/sched/mod.rs

//! Dependency-aware task scheduling.
//!
//! - [`task`] holds the task descriptor and the stored action callback types.
//! - `registry` owns the name→task map and the reverse-dependency index.
//! - [`scheduler`] contains the cascade engine: gated forward execution and
//!   unconditional revert propagation.

mod registry;
pub mod scheduler;
pub mod task;

pub use scheduler::Scheduler;
pub use task::{ExecuteFn, RevertFn};
