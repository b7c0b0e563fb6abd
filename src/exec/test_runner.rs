// src/exec/test_runner.rs

//! Test Orchestrator: run the test runner once, optionally against an
//! isolated server instance that is always torn down afterwards.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::TestRunnerFailure;
use crate::exec::command::{run_to_completion, shell_command};
use crate::exec::supervisor::{spawn_supervisor, SupervisorEvent, SupervisorOptions};

#[derive(Debug, Clone)]
pub struct TestOrchestrator {
    config: Arc<Config>,
}

impl TestOrchestrator {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Run the configured test runner.
    ///
    /// With `start_servers`, an isolated server is launched on
    /// `server.test_port` in test mode first and killed once the runner has
    /// finished, whatever the outcome.
    pub async fn run(&self, start_servers: bool) -> Result<(), TestRunnerFailure> {
        let Some(runner) = self.config.test.runner.clone() else {
            warn!("no [test].runner configured; nothing to run");
            return Ok(());
        };

        if !start_servers {
            return self.run_runner(&runner, None).await;
        }

        let options = SupervisorOptions::isolated_for_tests(&self.config);
        let port = options.port;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SupervisorEvent>();
        let server = spawn_supervisor(options, events_tx);

        // Wait until the isolated server is up (or failed to come up).
        while let Some(event) = events_rx.recv().await {
            match event {
                SupervisorEvent::Running { .. } => break,
                SupervisorEvent::Crashed { reason, .. } => {
                    warn!(reason = %reason, "isolated test server did not start; running tests anyway");
                    break;
                }
                _ => {}
            }
        }

        let outcome = self.run_runner(&runner, Some(port)).await;

        server.shutdown().await;
        info!(port, "isolated test server stopped");

        outcome
    }

    async fn run_runner(&self, runner: &str, server_port: Option<u16>) -> Result<(), TestRunnerFailure> {
        info!(runner = %runner, "running tests");

        let mut cmd = shell_command(runner);
        cmd.current_dir(self.config.root());
        if let Some(port) = server_port {
            cmd.env("PORT", port.to_string()).env("NODE_ENV", "test");
        }

        let status = run_to_completion("test-runner", cmd)
            .await
            .map_err(|err| TestRunnerFailure::Spawn(format!("{err:#}")))?;

        if status.success() {
            info!("tests passed");
            Ok(())
        } else {
            let status = status.code().unwrap_or(-1);
            warn!(status, "tests failed");
            Err(TestRunnerFailure::Failed { status })
        }
    }
}
