//! Run registry and concurrent run tests

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};

use perf_checkpoint::{RunRegistry, RunState, StatisticsAggregator, TrackerConfig};

fn registry_in(dir: &std::path::Path) -> RunRegistry {
    RunRegistry::new(
        TrackerConfig::builder()
            .output_dir(dir)
            .task_id("reg")
            .build(),
    )
}

#[test]
fn test_racing_get_or_create_yields_one_timer() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(registry_in(dir.path()));
    let barrier = Arc::new(Barrier::new(8));

    let timers: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    barrier.wait();
                    registry.get_or_create("contended")
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(registry.len(), 1);
    assert!(timers.iter().all(|t| Arc::ptr_eq(t, &timers[0])));
}

#[test]
fn test_concurrent_runs_write_distinct_records() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(registry_in(dir.path()));
    let barrier = Arc::new(Barrier::new(4));

    let counts: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                s.spawn(move || {
                    let run = registry.scoped(&format!("worker-{worker}"), &format!("run_{worker}"));
                    run.track("step", None);
                    barrier.wait();
                    run.finish().checkpoint_count
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(counts, [1, 1, 1, 1]);

    let files: Vec<PathBuf> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 4);

    let records = StatisticsAggregator::new().load_records(dir.path());
    assert_eq!(records.len(), 4);
    let names: HashSet<&str> = records.iter().map(|r| r.test_name()).collect();
    assert_eq!(names.len(), 4);
    let tasks: HashSet<&str> = records.iter().map(|r| r.task_id()).collect();
    assert!(tasks.contains("reg_worker-0"));
    assert_eq!(tasks.len(), 4);
}

#[test]
fn test_same_identity_runs_back_to_back() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());

    for i in 0..3 {
        let run = registry.scoped("worker", &format!("iteration_{i}"));
        run.track("only", None);
    }

    let records = StatisticsAggregator::new().load_records(dir.path());
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.checkpoint_count() == 1));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_scoped_run_finishes_on_early_return() {
    fn step(registry: &RunRegistry, fail: bool) -> Result<(), String> {
        let run = registry.scoped("early", "early_return");
        run.track("before", None);
        if fail {
            return Err("bailed out".to_string());
        }
        run.track("after", None);
        Ok(())
    }

    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    assert!(step(&registry, true).is_err());

    assert_eq!(registry.get_or_create("early").state(), RunState::Finished);
    let records = StatisticsAggregator::new().load_records(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].checkpoint_count(), 1);
}

#[test]
fn test_scoped_run_finishes_on_panic() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let run = registry.scoped("panicky", "panicking_run");
        run.track("before_panic", None);
        panic!("assertion failed in test body");
    }));
    assert!(outcome.is_err());

    let records = StatisticsAggregator::new().load_records(dir.path());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].test_name(), "panicking_run");
}

#[test]
fn test_current_thread_identity_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_in(dir.path());
    let a = registry.current_thread();
    let b = registry.current_thread();
    assert!(Arc::ptr_eq(&a, &b));

    let other = std::thread::scope(|s| s.spawn(|| registry.current_thread()).join().unwrap());
    assert!(!Arc::ptr_eq(&a, &other));
}
