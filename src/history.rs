// src/history.rs

//! Undo/redo action history with branch-redo semantics.
//!
//! [`History`] records executed [`Action`]s against a shared parameter value
//! and can walk the record backwards (`undo`) and forwards again (`redo`).
//! Undoing executes the action's inverse and records it, linked back to the
//! entry it undid; redoing re-executes and re-records the undone original.
//! Because undo/redo records are themselves queue entries, undoing after a
//! redo (or redoing a redone entry's undo) behaves like branching through
//! the history rather than truncating it.

use std::collections::HashSet;
use std::mem;
use std::sync::Arc;

use anyhow::Result;

/// Shared-ownership action handle; the same action may be recorded more than
/// once (each redo re-records the original).
pub type ArcAction<P> = Arc<dyn Action<P>>;

/// A reversible command over a parameter value of type `P`.
pub trait Action<P>: Send + Sync {
    /// Perform the action against the shared parameters.
    fn exec(&self, params: &mut P) -> Result<()>;

    /// Construct the action that reverses this one.
    fn invert(&self) -> ArcAction<P>;
}

/// Compound action: executes its members in order and inverts to the
/// reversed list of member inverses.
pub struct ActionList<P> {
    actions: Vec<ArcAction<P>>,
}

impl<P> ActionList<P> {
    pub fn new(actions: Vec<ArcAction<P>>) -> Self {
        Self { actions }
    }
}

impl<P: 'static> Action<P> for ActionList<P> {
    fn exec(&self, params: &mut P) -> Result<()> {
        for action in &self.actions {
            action.exec(params)?;
        }
        Ok(())
    }

    fn invert(&self) -> ArcAction<P> {
        let actions = self.actions.iter().rev().map(|a| a.invert()).collect();
        Arc::new(ActionList::new(actions))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Recording,
}

struct Entry<P> {
    action: ArcAction<P>,
    /// For undo records: index of the queue entry this one reverses.
    /// `None` for originals (including redone re-records).
    target: Option<usize>,
}

/// Command history over a shared parameter value.
pub struct History<P> {
    queue: Vec<Entry<P>>,
    /// Distance from the queue tail to the next redo candidate; advances by
    /// two per redo (past the redo record and the undo record it answered).
    redo_offset: usize,
    mode: Mode,
    record_buf: Vec<ArcAction<P>>,
    params: P,
}

impl<P: 'static> History<P> {
    pub fn new(params: P) -> Self {
        Self {
            queue: Vec::new(),
            redo_offset: 0,
            mode: Mode::Normal,
            record_buf: Vec::new(),
            params,
        }
    }

    /// Number of recorded entries (originals plus undo/redo records).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    /// Start grouping subsequently applied actions into one compound entry.
    /// If a recording is already open it is flushed first.
    pub fn begin_recording(&mut self) {
        if self.mode == Mode::Recording {
            self.end_recording();
        }
        self.mode = Mode::Recording;
    }

    /// Close the current recording, collapsing the group into a single
    /// [`ActionList`] entry so one `undo` reverses the whole group.
    pub fn end_recording(&mut self) {
        if !self.record_buf.is_empty() {
            let group = ActionList::new(mem::take(&mut self.record_buf));
            self.queue.push(Entry {
                action: Arc::new(group),
                target: None,
            });
        }
        self.mode = Mode::Normal;
    }

    /// Record and execute an action. Clears any pending redo state.
    pub fn apply(&mut self, action: ArcAction<P>) -> Result<()> {
        match self.mode {
            Mode::Recording => self.record_buf.push(Arc::clone(&action)),
            Mode::Normal => self.queue.push(Entry {
                action: Arc::clone(&action),
                target: None,
            }),
        }
        self.redo_offset = 0;
        action.exec(&mut self.params)
    }

    /// Reverse the most recent entry that is neither an undo record nor
    /// already undone. No-op when nothing is left to undo.
    pub fn undo(&mut self) -> Result<()> {
        if self.mode == Mode::Recording {
            self.end_recording();
        }

        let mut undone: HashSet<usize> = HashSet::new();
        let mut candidate = None;
        for (idx, entry) in self.queue.iter().enumerate().rev() {
            match entry.target {
                Some(target) => {
                    undone.insert(target);
                }
                None => {
                    if !undone.contains(&idx) {
                        candidate = Some(idx);
                        break;
                    }
                }
            }
        }

        let result = match candidate {
            Some(idx) => {
                let inverse = self.queue[idx].action.invert();
                self.queue.push(Entry {
                    action: Arc::clone(&inverse),
                    target: Some(idx),
                });
                inverse.exec(&mut self.params)
            }
            None => Ok(()),
        };

        self.redo_offset = 0;
        result
    }

    /// Re-execute and re-record the original behind the most recent
    /// unanswered undo record. No-op when there is nothing to redo (in
    /// particular after any new `apply`, which clears redo state).
    pub fn redo(&mut self) -> Result<()> {
        if self.mode == Mode::Recording {
            self.end_recording();
        }

        let Some(idx) = self.queue.len().checked_sub(1 + self.redo_offset) else {
            return Ok(());
        };
        let Some(target) = self.queue[idx].target else {
            return Ok(());
        };

        let original = Arc::clone(&self.queue[target].action);
        self.queue.push(Entry {
            action: Arc::clone(&original),
            target: None,
        });
        self.redo_offset += 2;
        original.exec(&mut self.params)
    }
}
