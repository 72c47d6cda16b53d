use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use taskdag::{Scheduler, SchedulerError};

fn add_noop(sched: &Scheduler, name: &str, depends: &[&str]) {
    sched
        .add(name, depends, || async { Ok(()) }, || async { Ok(()) })
        .unwrap();
}

#[test]
fn adding_a_task_increases_size() {
    let sched: Scheduler = Scheduler::new();
    assert_eq!(sched.size(), 0);

    add_noop(&sched, "test", &[]);
    assert_eq!(sched.size(), 1);
}

#[test]
fn adding_distinct_tasks_grows_the_registry() {
    let sched: Scheduler = Scheduler::new();

    add_noop(&sched, "test1", &[]);
    add_noop(&sched, "test2", &[]);
    assert_eq!(sched.size(), 2);
}

#[test]
fn adding_the_same_name_keeps_size_unchanged() {
    let sched: Scheduler = Scheduler::new();

    add_noop(&sched, "test", &[]);
    add_noop(&sched, "test", &[]);
    assert_eq!(sched.size(), 1);
}

#[tokio::test]
async fn re_adding_a_name_discards_the_old_state() {
    let sched: Scheduler = Scheduler::new();
    let runs = Arc::new(AtomicUsize::new(0));

    let r = Arc::clone(&runs);
    sched
        .add(
            "test",
            &[],
            move || {
                let r = Arc::clone(&r);
                async move {
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            || async { Ok(()) },
        )
        .unwrap();

    sched.execute("test").await.unwrap();
    assert!(sched.executed("test"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Replacing the task resets its flags, so it may run again.
    let r = Arc::clone(&runs);
    sched
        .add(
            "test",
            &[],
            move || {
                let r = Arc::clone(&r);
                async move {
                    r.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            || async { Ok(()) },
        )
        .unwrap();

    assert_eq!(sched.size(), 1);
    assert!(!sched.executed("test"));

    sched.execute("test").await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn replacing_a_task_while_its_action_is_in_flight_discards_the_stale_completion() {
    let sched: Scheduler = Scheduler::new();
    let gate = Arc::new(tokio::sync::Notify::new());
    let child_runs = Arc::new(AtomicUsize::new(0));

    let g = Arc::clone(&gate);
    sched
        .add(
            "parent",
            &[],
            move || {
                let g = Arc::clone(&g);
                async move {
                    g.notified().await;
                    Ok(())
                }
            },
            || async { Ok(()) },
        )
        .unwrap();
    let c = Arc::clone(&child_runs);
    sched
        .add(
            "child",
            &["parent"],
            move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            || async { Ok(()) },
        )
        .unwrap();

    let first = {
        let sched = sched.clone();
        tokio::spawn(async move { sched.execute("parent").await })
    };
    while !sched.running("parent") {
        tokio::task::yield_now().await;
    }

    // Replace the task while the old action is suspended inside the gate.
    add_noop(&sched, "parent", &[]);
    assert!(!sched.running("parent"));

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), Some(()));
    sched.wait_idle().await;

    // The stale completion neither marks the replacement nor cascades.
    assert!(!sched.executed("parent"));
    assert_eq!(child_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn removing_an_unknown_task_is_a_noop() {
    let sched: Scheduler = Scheduler::new();
    add_noop(&sched, "test", &[]);

    sched.remove("test1");
    assert_eq!(sched.size(), 1);
}

#[test]
fn removing_an_existing_task_decreases_size() {
    let sched: Scheduler = Scheduler::new();
    add_noop(&sched, "test1", &[]);
    add_noop(&sched, "test2", &[]);

    sched.remove("test1");
    assert_eq!(sched.size(), 1);
}

#[test]
fn add_then_remove_leaves_an_empty_registry() {
    let sched: Scheduler = Scheduler::new();
    add_noop(&sched, "test", &[]);
    assert_eq!(sched.size(), 1);

    sched.remove("test");
    assert_eq!(sched.size(), 0);
}

#[test]
fn forward_references_are_tolerated_at_registration() {
    let sched: Scheduler = Scheduler::new();

    // "a" is not registered; "b" may still declare it.
    sched
        .add("b", &["a"], || async { Ok(()) }, || async { Ok(()) })
        .unwrap();
    assert_eq!(sched.size(), 1);
}

#[test]
fn self_dependency_is_rejected() {
    let sched: Scheduler = Scheduler::new();

    let err = sched
        .add("a", &["a"], || async { Ok(()) }, || async { Ok(()) })
        .unwrap_err();
    assert_eq!(
        err,
        SchedulerError::SelfDependency {
            task: "a".to_string()
        }
    );
    assert_eq!(sched.size(), 0);
}

#[test]
fn dependency_cycle_is_rejected_without_registering() {
    let sched: Scheduler = Scheduler::new();

    add_noop(&sched, "a", &[]);
    add_noop(&sched, "b", &["a"]);
    sched
        .add("c", &["b"], || async { Ok(()) }, || async { Ok(()) })
        .unwrap();

    // Re-adding "a" so that it depends on "c" would close a -> b -> c -> a.
    let err = sched
        .add("a", &["c"], || async { Ok(()) }, || async { Ok(()) })
        .unwrap_err();
    assert!(matches!(err, SchedulerError::DependencyCycle { .. }));

    // The registry is untouched: the original "a" is still there.
    assert_eq!(sched.size(), 3);
}
