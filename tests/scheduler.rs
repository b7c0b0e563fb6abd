// tests/scheduler.rs

use std::path::PathBuf;

use assetdag::dag::{noop, Scheduler, TaskGraph, TaskRunState};
use assetdag::engine::{TaskOutcome, Trigger, TriggerQueue};
use assetdag::types::ReloadPolicy;

fn diamond() -> TaskGraph {
    let mut graph = TaskGraph::new();
    let none: [&str; 0] = [];
    graph.register("a", none, noop()).unwrap();
    graph.register("b", ["a"], noop()).unwrap();
    graph.register("c", ["a"], noop()).unwrap();
    graph.register("d", ["b", "c"], noop()).unwrap();
    graph.register("unrelated", none, noop()).unwrap();
    graph
}

fn names(list: &[String]) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

#[test]
fn scheduler_releases_dependents_wave_by_wave() {
    let graph = diamond();
    let mut scheduler = Scheduler::for_target(&graph, "d", 1).unwrap();

    assert_eq!(scheduler.start(), vec!["a".to_string()]);
    assert_eq!(scheduler.state_of("unrelated"), TaskRunState::NotInRun);

    let step = scheduler.handle_completion("a", TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["b", "c"]);

    let step = scheduler.handle_completion("b", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty(), "d still waits for c");

    let step = scheduler.handle_completion("c", TaskOutcome::Success);
    assert_eq!(names(&step.newly_scheduled), vec!["d"]);
    assert!(!step.run_just_finished);

    let step = scheduler.handle_completion("d", TaskOutcome::Success);
    assert!(step.run_just_finished);
    assert_eq!(scheduler.state_of("d"), TaskRunState::Succeeded);
}

#[test]
fn failure_blocks_transitive_dependents_but_not_siblings() {
    let graph = diamond();
    let mut scheduler = Scheduler::for_target(&graph, "d", 1).unwrap();
    scheduler.start();
    scheduler.handle_completion("a", TaskOutcome::Success);

    let step = scheduler.handle_completion("b", TaskOutcome::Failed("boom".to_string()));
    assert_eq!(names(&step.newly_blocked), vec!["d"]);
    assert!(!step.run_just_finished, "c is still running");
    assert_eq!(scheduler.state_of("c"), TaskRunState::Running);

    let step = scheduler.handle_completion("c", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert!(step.run_just_finished);
    assert_eq!(scheduler.state_of("b"), TaskRunState::Failed);
    assert_eq!(scheduler.state_of("d"), TaskRunState::Blocked);
}

#[test]
fn stray_completion_is_ignored() {
    let graph = diamond();
    let mut scheduler = Scheduler::for_target(&graph, "b", 1).unwrap();
    scheduler.start();

    let step = scheduler.handle_completion("b", TaskOutcome::Success);
    assert!(step.newly_scheduled.is_empty());
    assert_eq!(scheduler.state_of("b"), TaskRunState::Pending);
}

#[test]
fn queued_triggers_merge_per_task() {
    let mut queue = TriggerQueue::new();
    queue.record_trigger(
        Trigger::new("styles", ReloadPolicy::Stylesheet).with_files([PathBuf::from("a.less")]),
    );
    queue.record_trigger(Trigger::new("wiredep", ReloadPolicy::None));
    queue.record_trigger(
        Trigger::new("styles", ReloadPolicy::FullPage)
            .with_files([PathBuf::from("a.less"), PathBuf::from("b.less")]),
    );

    assert_eq!(queue.len(), 2);

    let first = queue.pop_next().unwrap();
    assert_eq!(first.task, "styles");
    assert_eq!(first.reload, ReloadPolicy::FullPage);
    assert_eq!(first.files, vec![PathBuf::from("a.less"), PathBuf::from("b.less")]);

    assert_eq!(queue.pop_next().unwrap().task, "wiredep");
    assert!(queue.pop_next().is_none());
    assert!(queue.is_empty());
}
