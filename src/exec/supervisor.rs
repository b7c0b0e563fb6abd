// src/exec/supervisor.rs

//! Process Supervisor for the server-under-development.
//!
//! The supervisor is an actor: one Tokio task owns the child process and
//! reacts to control messages (restart, shutdown) and to the child exiting.
//! Every state transition is emitted as a [`SupervisorEvent`].

use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::exec::command::forward_output;
use crate::types::BuildMode;

/// Lifecycle of the supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Crashed,
    Exited,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Stopped => "stopped",
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Crashed => "crashed",
            SupervisorState::Exited => "exited",
        };
        f.write_str(s)
    }
}

/// One transition of the supervisor state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Entered `Starting`. `restart` is set when a running child is being replaced.
    Starting { restart: bool },
    /// Entered `Running`.
    Running { restart: bool, pid: Option<u32> },
    /// Entered `Crashed`: the child could not be launched or terminated on its own.
    Crashed { code: Option<i32>, reason: String },
    /// Entered `Exited` after a shutdown request.
    Exited,
}

impl SupervisorEvent {
    /// State the supervisor is in after this event.
    pub fn state(&self) -> SupervisorState {
        match self {
            SupervisorEvent::Starting { .. } => SupervisorState::Starting,
            SupervisorEvent::Running { .. } => SupervisorState::Running,
            SupervisorEvent::Crashed { .. } => SupervisorState::Crashed,
            SupervisorEvent::Exited => SupervisorState::Exited,
        }
    }

    /// True for the `Running` event that follows a restart.
    pub fn is_restarted(&self) -> bool {
        matches!(self, SupervisorEvent::Running { restart: true, .. })
    }
}

/// How to launch the server-under-development.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Program the entry point is handed to (e.g. `node`).
    pub command: String,
    /// Absolute path of the server entry point.
    pub entry: PathBuf,
    /// Working directory of the child.
    pub cwd: PathBuf,
    pub mode: BuildMode,
    pub port: u16,
    /// Window in which restart requests coalesce into one restart.
    pub restart_delay: Duration,
}

impl SupervisorOptions {
    /// Options for the dev/build server on the configured port.
    pub fn from_config(cfg: &Config, mode: BuildMode) -> Self {
        Self {
            command: cfg.server.command.clone(),
            entry: cfg.resolve_path(&cfg.server.entry),
            cwd: cfg.root().to_path_buf(),
            mode,
            port: cfg.port(),
            restart_delay: cfg.serve.restart_delay(),
        }
    }

    /// Options for the isolated instance the test orchestrator starts.
    pub fn isolated_for_tests(cfg: &Config) -> Self {
        Self {
            port: cfg.server.test_port,
            ..Self::from_config(cfg, BuildMode::Test)
        }
    }
}

/// Something that can be asked to restart the server-under-development.
pub trait ServerRestarter: Send + Sync {
    fn restart(&self, changed: Vec<PathBuf>);
}

/// Cloneable restart-only view of a [`SupervisorHandle`].
#[derive(Debug, Clone)]
pub struct SupervisorRestarter {
    control_tx: mpsc::UnboundedSender<Control>,
}

impl ServerRestarter for SupervisorRestarter {
    fn restart(&self, changed: Vec<PathBuf>) {
        if self.control_tx.send(Control::Restart(changed)).is_err() {
            warn!("supervisor is gone; restart request dropped");
        }
    }
}

#[derive(Debug)]
enum Control {
    Restart(Vec<PathBuf>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running supervisor.
///
/// Dropping the handle and every [`SupervisorRestarter`] without calling
/// [`shutdown`](Self::shutdown) still kills the child: the actor exits when
/// its control channel closes.
#[derive(Debug)]
pub struct SupervisorHandle {
    control_tx: mpsc::UnboundedSender<Control>,
    state_rx: watch::Receiver<SupervisorState>,
    join: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Current state of the state machine.
    pub fn state(&self) -> SupervisorState {
        *self.state_rx.borrow()
    }

    /// Request a restart because watched server files changed.
    ///
    /// Requests arriving while a restart is already pending are merged into it.
    pub fn restart(&self, changed: Vec<PathBuf>) {
        self.restarter().restart(changed);
    }

    pub fn restarter(&self) -> SupervisorRestarter {
        SupervisorRestarter {
            control_tx: self.control_tx.clone(),
        }
    }

    /// Kill the child (if any) and wait for the supervisor to reach `Exited`.
    pub async fn shutdown(mut self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.control_tx.send(Control::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "supervisor task ended abnormally");
            }
        }
    }
}

/// Start supervising a server process.
///
/// Events are sent on `events` converted into the receiver's event type, so
/// the coordinator can fold them into its own inbox.
pub fn spawn_supervisor<E>(options: SupervisorOptions, events: mpsc::UnboundedSender<E>) -> SupervisorHandle
where
    E: From<SupervisorEvent> + Send + 'static,
{
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(SupervisorState::Stopped);

    let actor = SupervisorActor {
        options,
        events,
        state_tx,
        child: None,
    };
    let join = tokio::spawn(actor.run(control_rx));

    SupervisorHandle {
        control_tx,
        state_rx,
        join: Some(join),
    }
}

struct SupervisorActor<E> {
    options: SupervisorOptions,
    events: mpsc::UnboundedSender<E>,
    state_tx: watch::Sender<SupervisorState>,
    child: Option<Child>,
}

impl<E> SupervisorActor<E>
where
    E: From<SupervisorEvent> + Send + 'static,
{
    async fn run(mut self, mut control_rx: mpsc::UnboundedReceiver<Control>) {
        info!(
            entry = %self.options.entry.display(),
            port = self.options.port,
            mode = %self.options.mode,
            "supervisor started"
        );
        self.launch(false).await;

        // Single in-flight restart marker: the deadline of the pending restart.
        let mut restart_at: Option<Instant> = None;
        let mut pending_changes: Vec<PathBuf> = Vec::new();

        loop {
            tokio::select! {
                ctrl = control_rx.recv() => match ctrl {
                    Some(Control::Restart(changed)) => {
                        debug!(files = ?changed, "restart requested");
                        pending_changes.extend(changed);
                        if restart_at.is_none() {
                            restart_at = Some(Instant::now() + self.options.restart_delay);
                        }
                    }
                    Some(Control::Shutdown(ack)) => {
                        self.stop().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.stop().await;
                        break;
                    }
                },

                status = wait_child(&mut self.child) => {
                    self.child = None;
                    self.report_crash(status);
                }

                _ = sleep_until(restart_at.unwrap_or_else(Instant::now)), if restart_at.is_some() => {
                    restart_at = None;
                    let changed = std::mem::take(&mut pending_changes);
                    info!(files = changed.len(), "restarting server after file changes");
                    self.kill_child().await;
                    self.launch(true).await;
                }
            }
        }

        debug!("supervisor loop finished");
    }

    /// `Starting`, then `Running` or `Crashed`.
    async fn launch(&mut self, restart: bool) {
        self.transition(SupervisorEvent::Starting { restart });

        match tokio::fs::try_exists(&self.options.entry).await {
            Ok(true) => {}
            _ => {
                let reason = format!(
                    "server entry point {} does not exist",
                    self.options.entry.display()
                );
                error!(entry = %self.options.entry.display(), "server crashed: entry point missing");
                self.transition(SupervisorEvent::Crashed { code: None, reason });
                return;
            }
        }

        match self.spawn_child() {
            Ok(mut child) => {
                let pid = child.id();
                forward_output("server", &mut child);
                self.child = Some(child);
                info!(pid = ?pid, port = self.options.port, restart, "server running");
                self.transition(SupervisorEvent::Running { restart, pid });
            }
            Err(err) => {
                let reason = format!("{err:#}");
                error!(error = %reason, "server crashed: failed to launch");
                self.transition(SupervisorEvent::Crashed { code: None, reason });
            }
        }
    }

    fn spawn_child(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.options.command);
        cmd.arg(&self.options.entry)
            .current_dir(&self.options.cwd)
            .env("PORT", self.options.port.to_string())
            .env("NODE_ENV", self.options.mode.as_env_value())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        cmd.spawn()
            .with_context(|| format!("spawning '{}'", self.options.command))
    }

    fn report_crash(&mut self, status: std::io::Result<ExitStatus>) {
        let (code, reason) = match status {
            Ok(status) => (status.code(), format!("server exited unexpectedly ({status})")),
            Err(err) => (None, format!("waiting for server failed: {err}")),
        };
        error!(code = ?code, reason = %reason, "server crashed; waiting for a change to restart");
        self.transition(SupervisorEvent::Crashed { code, reason });
    }

    async fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to kill server process");
            }
        }
    }

    /// Shutdown from any state: kill, then `Exited`.
    async fn stop(&mut self) {
        self.kill_child().await;
        info!("server stopped");
        self.transition(SupervisorEvent::Exited);
    }

    fn transition(&self, event: SupervisorEvent) {
        let next = event.state();
        let prev = self.state_tx.send_replace(next);
        debug!(from = %prev, to = %next, "supervisor transition");
        // Nobody listening is fine (e.g. the coordinator already shut down).
        let _ = self.events.send(E::from(event));
    }
}

async fn wait_child(child: &mut Option<Child>) -> std::io::Result<ExitStatus> {
    match child {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}
