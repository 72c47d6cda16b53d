use std::sync::Arc;

use anyhow::Result;
use taskdag::{Action, ArcAction, History};

/// Adds a constant to the shared counter; inverts to the subtraction.
struct Add {
    n: i64,
}

impl Add {
    fn arc(n: i64) -> ArcAction<i64> {
        Arc::new(Add { n })
    }
}

impl Action<i64> for Add {
    fn exec(&self, params: &mut i64) -> Result<()> {
        *params += self.n;
        Ok(())
    }

    fn invert(&self) -> ArcAction<i64> {
        Add::arc(-self.n)
    }
}

#[test]
fn apply_executes_and_records_actions() {
    let mut history = History::new(0i64);

    history.apply(Add::arc(1)).unwrap();
    history.apply(Add::arc(2)).unwrap();

    assert_eq!(*history.params(), 3);
    assert_eq!(history.len(), 2);
}

#[test]
fn undo_reverses_the_latest_action() {
    let mut history = History::new(0i64);
    history.apply(Add::arc(1)).unwrap();
    history.apply(Add::arc(2)).unwrap();

    history.undo().unwrap();
    assert_eq!(*history.params(), 1);

    history.undo().unwrap();
    assert_eq!(*history.params(), 0);
}

#[test]
fn undo_on_an_empty_history_is_a_noop() {
    let mut history = History::new(7i64);
    history.undo().unwrap();
    assert_eq!(*history.params(), 7);
    assert!(history.is_empty());
}

#[test]
fn undo_stops_once_everything_is_undone() {
    let mut history = History::new(0i64);
    history.apply(Add::arc(5)).unwrap();

    history.undo().unwrap();
    history.undo().unwrap();
    assert_eq!(*history.params(), 0);
}

#[test]
fn redo_reapplies_undone_actions_oldest_branch_last() {
    let mut history = History::new(0i64);
    history.apply(Add::arc(1)).unwrap();
    history.apply(Add::arc(2)).unwrap();

    history.undo().unwrap();
    history.undo().unwrap();
    assert_eq!(*history.params(), 0);

    history.redo().unwrap();
    assert_eq!(*history.params(), 1);
    history.redo().unwrap();
    assert_eq!(*history.params(), 3);
}

#[test]
fn redo_after_a_new_apply_is_a_noop() {
    let mut history = History::new(0i64);
    history.apply(Add::arc(1)).unwrap();
    history.undo().unwrap();
    history.apply(Add::arc(5)).unwrap();

    history.redo().unwrap();
    assert_eq!(*history.params(), 5);
}

#[test]
fn undo_after_redo_reverses_the_redone_action() {
    let mut history = History::new(0i64);
    history.apply(Add::arc(1)).unwrap();
    history.apply(Add::arc(2)).unwrap();

    history.undo().unwrap();
    history.redo().unwrap();
    assert_eq!(*history.params(), 3);

    history.undo().unwrap();
    assert_eq!(*history.params(), 1);
}

#[test]
fn recording_groups_actions_into_a_single_undo_step() {
    let mut history = History::new(0i64);

    history.begin_recording();
    history.apply(Add::arc(1)).unwrap();
    history.apply(Add::arc(2)).unwrap();
    history.apply(Add::arc(3)).unwrap();
    assert_eq!(*history.params(), 6);
    // Buffered while recording; nothing committed yet.
    assert!(history.is_empty());

    history.end_recording();
    assert_eq!(history.len(), 1);

    history.undo().unwrap();
    assert_eq!(*history.params(), 0);
}

#[test]
fn undo_flushes_an_open_recording() {
    let mut history = History::new(0i64);

    history.begin_recording();
    history.apply(Add::arc(4)).unwrap();

    history.undo().unwrap();
    assert_eq!(*history.params(), 0);
    assert_eq!(history.len(), 2);
}
