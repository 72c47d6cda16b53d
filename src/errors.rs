// src/errors.rs

//! Crate-wide error types and aliases.
//!
//! Caller-supplied actions (task execute/revert, pool jobs, event handlers)
//! report failures through `anyhow`; the structured variants below cover the
//! registration errors the scheduler itself can raise.

use thiserror::Error;

pub use anyhow::{Error, Result};

/// Errors raised when registering tasks with a [`Scheduler`].
///
/// [`Scheduler`]: crate::sched::Scheduler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// A task listed its own name in `depends`.
    #[error("task '{task}' cannot depend on itself")]
    SelfDependency { task: String },

    /// Registering the task would close a dependency cycle among the
    /// currently-registered tasks.
    #[error("dependency cycle detected involving task '{task}'")]
    DependencyCycle { task: String },
}
