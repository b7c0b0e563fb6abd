// tests/test_orchestrator.rs
#![cfg(unix)]

use std::fs;
use std::sync::Arc;

use assetdag::errors::TestRunnerFailure;
use assetdag::exec::TestOrchestrator;
use assetdag_test_utils::builders::ConfigBuilder;
use assetdag_test_utils::{init_tracing, with_timeout};

#[tokio::test]
async fn passing_runner_succeeds() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new(dir.path()).with_test_runner("true").build();

    let result = with_timeout(TestOrchestrator::new(Arc::new(config)).run(false)).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn runner_exit_code_is_reported() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new(dir.path()).with_test_runner("exit 3").build();

    let result = with_timeout(TestOrchestrator::new(Arc::new(config)).run(false)).await;
    assert_eq!(result, Err(TestRunnerFailure::Failed { status: 3 }));
}

#[tokio::test]
async fn missing_runner_is_not_a_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new(dir.path()).build();

    let result = with_timeout(TestOrchestrator::new(Arc::new(config)).run(true)).await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn isolated_server_runs_on_the_test_port_and_is_torn_down() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("server.sh"),
        "echo \"$$ $PORT $NODE_ENV\" > server.info\nexec sleep 30\n",
    )
    .unwrap();
    let config = ConfigBuilder::new(dir.path())
        .with_server("sh", "server.sh")
        .with_test_runner(
            "while [ ! -s server.info ]; do sleep 0.05; done; test \"$PORT\" = 8888 && exit 4",
        )
        .build();

    let result = with_timeout(TestOrchestrator::new(Arc::new(config)).run(true)).await;
    // The runner saw the isolated port, then failed on purpose.
    assert_eq!(result, Err(TestRunnerFailure::Failed { status: 4 }));

    let info = fs::read_to_string(dir.path().join("server.info")).unwrap();
    let fields: Vec<&str> = info.split_whitespace().collect();
    assert_eq!(fields[1..], ["8888", "test"]);

    let alive = std::process::Command::new("kill")
        .args(["-0", fields[0]])
        .status()
        .unwrap()
        .success();
    assert!(!alive, "isolated server must be killed after the run");
}
