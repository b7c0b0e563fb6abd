// tests/supervisor.rs
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use assetdag::exec::{spawn_supervisor, SupervisorEvent, SupervisorOptions, SupervisorState};
use assetdag::types::BuildMode;
use assetdag_test_utils::{init_tracing, with_timeout};
use tokio::sync::mpsc;

fn options(root: &Path, entry: &str) -> SupervisorOptions {
    SupervisorOptions {
        command: "sh".to_string(),
        entry: root.join(entry),
        cwd: root.to_path_buf(),
        mode: BuildMode::Dev,
        port: 7203,
        restart_delay: Duration::from_millis(100),
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<SupervisorEvent>) -> SupervisorEvent {
    with_timeout(rx.recv()).await.expect("supervisor event channel closed")
}

#[tokio::test]
async fn missing_entry_point_crashes_without_spawning() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<SupervisorEvent>();

    let handle = spawn_supervisor(options(dir.path(), "missing.sh"), tx);

    assert_eq!(next(&mut rx).await, SupervisorEvent::Starting { restart: false });
    match next(&mut rx).await {
        SupervisorEvent::Crashed { code, reason } => {
            assert_eq!(code, None);
            assert!(reason.contains("missing.sh"), "reason was {reason}");
        }
        other => panic!("expected Crashed, got {other:?}"),
    }
    assert_eq!(handle.state(), SupervisorState::Crashed);

    handle.shutdown().await;
    assert_eq!(next(&mut rx).await, SupervisorEvent::Exited);
}

#[tokio::test]
async fn child_exit_is_reported_as_a_crash() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("server.sh"), "exit 3\n").unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<SupervisorEvent>();

    let handle = spawn_supervisor(options(dir.path(), "server.sh"), tx);

    assert_eq!(next(&mut rx).await, SupervisorEvent::Starting { restart: false });
    assert!(matches!(next(&mut rx).await, SupervisorEvent::Running { restart: false, .. }));
    match next(&mut rx).await {
        SupervisorEvent::Crashed { code, .. } => assert_eq!(code, Some(3)),
        other => panic!("expected Crashed, got {other:?}"),
    }

    handle.shutdown().await;
}

#[tokio::test]
async fn restart_burst_coalesces_into_one_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("server.sh"), "exec sleep 30\n").unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<SupervisorEvent>();

    let handle = spawn_supervisor(options(dir.path(), "server.sh"), tx);
    assert_eq!(next(&mut rx).await, SupervisorEvent::Starting { restart: false });
    assert!(matches!(next(&mut rx).await, SupervisorEvent::Running { restart: false, .. }));

    for file in ["a.js", "b.js", "c.js"] {
        handle.restart(vec![PathBuf::from(file)]);
    }

    assert_eq!(next(&mut rx).await, SupervisorEvent::Starting { restart: true });
    let restarted = next(&mut rx).await;
    assert!(restarted.is_restarted(), "got {restarted:?}");
    assert_eq!(handle.state(), SupervisorState::Running);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(rx.try_recv().is_err(), "only one restart expected");

    handle.shutdown().await;
    assert_eq!(next(&mut rx).await, SupervisorEvent::Exited);
}
