// tests/task_graph.rs

use assetdag::dag::TaskGraph;
use assetdag::engine::TaskRunner;
use assetdag::errors::TaskError;
use assetdag_test_utils::recording::{failing_action, recording_action, ActionLog};
use assetdag_test_utils::{init_tracing, with_timeout};

/// a <- b, a <- c, (b, c) <- d
fn diamond(log: &ActionLog) -> TaskGraph {
    let mut graph = TaskGraph::new();
    let none: [&str; 0] = [];
    graph.register("a", none, recording_action(log, "a")).unwrap();
    graph.register("b", ["a"], recording_action(log, "b")).unwrap();
    graph.register("c", ["a"], recording_action(log, "c")).unwrap();
    graph.register("d", ["b", "c"], recording_action(log, "d")).unwrap();
    graph
}

#[tokio::test]
async fn shared_prerequisite_runs_once_per_run() {
    init_tracing();
    let log = ActionLog::new();
    let runner = TaskRunner::new(diamond(&log)).unwrap();

    with_timeout(runner.run("d")).await.unwrap();

    assert_eq!(log.count("a"), 1);
    assert_eq!(log.count("d"), 1);
    assert_eq!(log.entries().len(), 4);

    let a = log.position("a").unwrap();
    let d = log.position("d").unwrap();
    assert!(a < log.position("b").unwrap());
    assert!(a < log.position("c").unwrap());
    assert!(log.position("b").unwrap() < d);
    assert!(log.position("c").unwrap() < d);
}

#[tokio::test]
async fn every_run_re_executes_its_prerequisites() {
    init_tracing();
    let log = ActionLog::new();
    let runner = TaskRunner::new(diamond(&log)).unwrap();

    with_timeout(runner.run("d")).await.unwrap();
    with_timeout(runner.run("d")).await.unwrap();

    assert_eq!(log.count("a"), 2);
    assert_eq!(log.count("d"), 2);
}

#[tokio::test]
async fn running_a_leaf_only_touches_its_closure() {
    init_tracing();
    let log = ActionLog::new();
    let runner = TaskRunner::new(diamond(&log)).unwrap();

    with_timeout(runner.run("b")).await.unwrap();

    assert_eq!(log.entries(), vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn failure_blocks_dependents_and_reports_the_failing_task() {
    init_tracing();
    let log = ActionLog::new();
    let mut graph = TaskGraph::new();
    let none: [&str; 0] = [];
    graph.register("a", none, recording_action(&log, "a")).unwrap();
    graph.register("b", ["a"], failing_action(&log, "b", "boom")).unwrap();
    graph.register("c", ["a"], recording_action(&log, "c")).unwrap();
    graph.register("d", ["b", "c"], recording_action(&log, "d")).unwrap();
    let runner = TaskRunner::new(graph).unwrap();

    let err = with_timeout(runner.run("d")).await.unwrap_err();

    match &err {
        TaskError::ActionFailed(task, cause) => {
            assert_eq!(task, "b");
            assert!(cause.contains("boom"), "cause was {cause}");
        }
        other => panic!("expected ActionFailed, got {other:?}"),
    }
    assert_eq!(err.task(), Some("b"));
    assert_eq!(log.count("d"), 0, "dependent of a failed task must not run");
}

#[test]
fn cycle_is_rejected_before_any_action_runs() {
    let log = ActionLog::new();
    let mut graph = TaskGraph::new();
    graph.register("a", ["b"], recording_action(&log, "a")).unwrap();
    graph.register("b", ["a"], recording_action(&log, "b")).unwrap();

    let err = TaskRunner::new(graph).unwrap_err();

    match err {
        TaskError::CycleDetected(path) => {
            assert_eq!(path.len(), 3, "path was {path:?}");
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&"a".to_string()));
            assert!(path.contains(&"b".to_string()));
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
    assert!(log.entries().is_empty());
}

#[test]
fn unknown_prerequisite_is_rejected() {
    let log = ActionLog::new();
    let mut graph = TaskGraph::new();
    graph.register("a", ["missing"], recording_action(&log, "a")).unwrap();

    assert_eq!(
        TaskRunner::new(graph).unwrap_err(),
        TaskError::UnknownTask("missing".to_string())
    );
}

#[test]
fn duplicate_registration_is_rejected() {
    let log = ActionLog::new();
    let mut graph = TaskGraph::new();
    let none: [&str; 0] = [];
    graph.register("a", none, recording_action(&log, "a")).unwrap();

    assert_eq!(
        graph.register("a", none, recording_action(&log, "a")),
        Err(TaskError::DuplicateTask("a".to_string()))
    );
}

#[tokio::test]
async fn unknown_target_is_an_error() {
    let log = ActionLog::new();
    let runner = TaskRunner::new(diamond(&log)).unwrap();

    assert_eq!(
        runner.run("nope").await,
        Err(TaskError::UnknownTask("nope".to_string()))
    );
    assert!(log.entries().is_empty());
}
