// src/sched/registry.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::SchedulerError;
use crate::sched::task::{ExecuteFn, RevertFn, Task};

/// Outcome of trying to claim a task for execution.
pub(crate) enum Claim<T> {
    /// No task is registered under that name.
    Unknown,
    /// At least one direct prerequisite is missing or not yet executed.
    Unsatisfied,
    /// The task is already executed or currently running; nothing to do.
    Settled,
    /// The task was claimed: `running` is now set and the caller must either
    /// `complete` or `release` it with the returned epoch.
    Ready { execute: ExecuteFn<T>, epoch: u64 },
}

/// The scheduler's bookkeeping: the name→task map plus the reverse-dependency
/// index, both mutated only through the operations below.
///
/// The index maps a prerequisite name to the names of the tasks that declared
/// it, in registration order. It is built purely from `depends` lists, so
/// forward references (prerequisites that are not registered tasks) simply
/// produce index keys with no matching task.
pub(crate) struct Registry<T> {
    tasks: HashMap<String, Task<T>>,
    dependents: HashMap<String, Vec<String>>,
    /// Monotonically increasing registration counter; stamps task epochs.
    registrations: u64,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            dependents: HashMap::new(),
            registrations: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn executed(&self, name: &str) -> bool {
        self.tasks.get(name).is_some_and(|t| t.executed)
    }

    pub fn running(&self, name: &str) -> bool {
        self.tasks.get(name).is_some_and(|t| t.running)
    }

    /// Register a task, replacing (and discarding the state of) any existing
    /// task of the same name.
    ///
    /// Rejects self-dependencies and dependency cycles among the
    /// currently-registered tasks without mutating anything.
    ///
    /// A replaced task's contributions to the reverse index are *not*
    /// retracted; the stale entries resolve to the same name and are
    /// harmless for execution (the claim guard skips duplicates), though a
    /// revert cascade will visit the name once per entry.
    pub fn insert(
        &mut self,
        name: String,
        depends: Vec<String>,
        execute: ExecuteFn<T>,
        revert: RevertFn,
    ) -> Result<(), SchedulerError> {
        if depends.iter().any(|d| *d == name) {
            return Err(SchedulerError::SelfDependency { task: name });
        }
        self.check_acyclic(&name, &depends)?;

        self.registrations += 1;
        let task = Task {
            name: name.clone(),
            depends,
            execute,
            revert,
            executed: false,
            running: false,
            epoch: self.registrations,
        };

        for dep in &task.depends {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(name.clone());
        }
        self.tasks.insert(name, task);
        Ok(())
    }

    /// Deregister a task, retracting its own contributions to the reverse
    /// index. Index entries keyed by the removed task's *name* (contributed
    /// by other tasks that depend on it) are left intact.
    ///
    /// Returns false if the name was unknown.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(task) = self.tasks.remove(name) else {
            return false;
        };

        for dep in &task.depends {
            if let Some(list) = self.dependents.get_mut(dep) {
                if let Some(pos) = list.iter().position(|n| n == name) {
                    list.remove(pos);
                }
                if list.is_empty() {
                    self.dependents.remove(dep);
                }
            }
        }
        true
    }

    /// Attempt to claim a task for execution, checking in order: unknown,
    /// unsatisfied prerequisites, already settled, then claim.
    pub fn claim(&mut self, name: &str) -> Claim<T> {
        let depends = match self.tasks.get(name) {
            None => return Claim::Unknown,
            Some(task) => task.depends.clone(),
        };

        if !self.deps_satisfied(&depends) {
            return Claim::Unsatisfied;
        }

        match self.tasks.get_mut(name) {
            Some(task) if !task.executed && !task.running => {
                task.running = true;
                Claim::Ready {
                    execute: task.execute.clone(),
                    epoch: task.epoch,
                }
            }
            _ => Claim::Settled,
        }
    }

    /// Mark a claimed task as completed and return the dependents that are
    /// now eligible to run, in index order.
    ///
    /// A stale epoch (the task was replaced or removed while its action was
    /// suspended) leaves the current entry untouched and cascades nothing.
    pub fn complete(&mut self, name: &str, epoch: u64) -> Vec<String> {
        match self.tasks.get_mut(name) {
            Some(task) if task.epoch == epoch => {
                task.running = false;
                task.executed = true;
            }
            _ => return Vec::new(),
        }

        let children = self
            .dependents
            .get(name)
            .cloned()
            .unwrap_or_default();
        children
            .into_iter()
            .filter(|child| self.eligible(child))
            .collect()
    }

    /// Clear the `running` flag of a claimed task whose action failed,
    /// leaving `executed` false so a later call may retry.
    pub fn release(&mut self, name: &str, epoch: u64) {
        if let Some(task) = self.tasks.get_mut(name) {
            if task.epoch == epoch {
                task.running = false;
            }
        }
    }

    /// Look up the revert action for a task, or None if the name is unknown.
    pub fn begin_revert(&self, name: &str) -> Option<(RevertFn, u64)> {
        self.tasks
            .get(name)
            .map(|task| (task.revert.clone(), task.epoch))
    }

    /// Reset a task's flags after its revert action settled. Unconditional
    /// with respect to prior state, but guarded by epoch like `complete`.
    pub fn reset(&mut self, name: &str, epoch: u64) {
        if let Some(task) = self.tasks.get_mut(name) {
            if task.epoch == epoch {
                task.executed = false;
                task.running = false;
            }
        }
    }

    /// Names of the tasks that declared `name` as a prerequisite, in
    /// registration order.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.dependents
            .get(name)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// A task is eligible when it is registered and every direct
    /// prerequisite refers to a registered, executed task.
    fn eligible(&self, name: &str) -> bool {
        self.tasks
            .get(name)
            .is_some_and(|task| self.deps_satisfied(&task.depends))
    }

    fn deps_satisfied(&self, depends: &[String]) -> bool {
        depends
            .iter()
            .all(|dep| self.tasks.get(dep).is_some_and(|t| t.executed))
    }

    /// Reject registrations that would close a dependency cycle.
    ///
    /// Edges point dep → task, so a topological order exists iff there is
    /// no dependency cycle. The
    /// candidate's edges replace those of any same-named existing task.
    /// Unregistered prerequisite names become isolated sources and cannot
    /// close a cycle on their own.
    fn check_acyclic(&self, name: &str, depends: &[String]) -> Result<(), SchedulerError> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        graph.add_node(name);
        for dep in depends {
            graph.add_edge(dep.as_str(), name, ());
        }

        for (task_name, task) in self.tasks.iter() {
            if task_name == name {
                continue;
            }
            graph.add_node(task_name.as_str());
            for dep in &task.depends {
                graph.add_edge(dep.as_str(), task_name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(SchedulerError::DependencyCycle {
                task: cycle.node_id().to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use futures::FutureExt;

    fn noop<T: Send + 'static + Default>() -> (ExecuteFn<T>, RevertFn) {
        (
            Arc::new(|| async { Ok(T::default()) }.boxed()),
            Arc::new(|| async { Ok(()) }.boxed()),
        )
    }

    fn add(reg: &mut Registry<()>, name: &str, depends: &[&str]) -> Result<(), SchedulerError> {
        let (execute, revert) = noop();
        reg.insert(
            name.to_string(),
            depends.iter().map(|d| d.to_string()).collect(),
            execute,
            revert,
        )
    }

    #[test]
    fn index_tracks_dependents_in_registration_order() {
        let mut reg = Registry::new();
        add(&mut reg, "a", &[]).unwrap();
        add(&mut reg, "c", &["a"]).unwrap();
        add(&mut reg, "b", &["a"]).unwrap();

        assert_eq!(reg.dependents_of("a"), ["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn remove_retracts_own_contributions_only() {
        let mut reg = Registry::new();
        add(&mut reg, "a", &[]).unwrap();
        add(&mut reg, "b", &["a"]).unwrap();
        add(&mut reg, "c", &["b"]).unwrap();

        assert!(reg.remove("b"));
        // b's own contribution under "a" is gone, slot deleted with it.
        assert!(reg.dependents_of("a").is_empty());
        // entries keyed by the removed task's name stay behind.
        assert_eq!(reg.dependents_of("b"), ["c".to_string()]);
    }

    #[test]
    fn replacing_a_task_keeps_stale_index_entries() {
        let mut reg = Registry::new();
        add(&mut reg, "a", &[]).unwrap();
        add(&mut reg, "b", &["a"]).unwrap();
        add(&mut reg, "b", &["a"]).unwrap();

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.dependents_of("a"), ["b".to_string(), "b".to_string()]);
    }

    #[test]
    fn forward_references_create_index_slots_without_tasks() {
        let mut reg = Registry::new();
        add(&mut reg, "b", &["a"]).unwrap();

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.dependents_of("a"), ["b".to_string()]);
        assert!(matches!(reg.claim("b"), Claim::Unsatisfied));
    }

    #[test]
    fn cycle_through_forward_reference_is_caught_when_it_closes() {
        let mut reg = Registry::new();
        add(&mut reg, "x", &["ghost"]).unwrap();
        let err = add(&mut reg, "ghost", &["x"]).unwrap_err();

        assert!(matches!(err, SchedulerError::DependencyCycle { .. }));
        assert_eq!(reg.len(), 1);
    }
}
