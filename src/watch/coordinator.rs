// src/watch/coordinator.rs

//! Watch/Reload Coordinator.
//!
//! A single event loop owns all watch-session decisions. File changes,
//! supervisor transitions, finished runs and timers all arrive as
//! [`CoordinatorEvent`]s on one channel, so their handling order is the
//! order they were delivered in.
//!
//! - Changes are debounced; a burst becomes one trigger per task.
//! - At most one Task Graph run is in flight; queued triggers wait for it.
//! - A reload notification is emitted only after the run it belongs to has
//!   finished successfully.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::{TaskRunner, Trigger, TriggerQueue};
use crate::errors::TaskError;
use crate::exec::{ServerRestarter, SupervisorEvent};
use crate::reload::{ReloadChannel, ReloadOptions};
use crate::types::{BuildMode, ReloadPolicy};
use crate::watch::patterns::{relative_str, ChangeClassifier, ChangeKind};

/// Message shown in browsers before the post-restart reload.
pub const RESTART_RELOAD_MESSAGE: &str = "reloading now...";

#[derive(Debug)]
pub enum CoordinatorEvent {
    /// Paths reported by the filesystem watcher (absolute or root-relative).
    FilesChanged(Vec<PathBuf>),
    Supervisor(SupervisorEvent),
    RunFinished {
        trigger: Trigger,
        result: Result<(), TaskError>,
    },
    Shutdown,
}

impl From<SupervisorEvent> for CoordinatorEvent {
    fn from(event: SupervisorEvent) -> Self {
        CoordinatorEvent::Supervisor(event)
    }
}

/// Which sources are being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// Live sources: styles are hot-swapped, scripts re-wired.
    Dev,
    /// Optimized build: any client change rebuilds everything.
    Build,
}

impl ServeMode {
    /// Environment mode of the supervised server.
    pub fn build_mode(self) -> BuildMode {
        match self {
            ServeMode::Dev => BuildMode::Dev,
            ServeMode::Build => BuildMode::Build,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    pub mode: ServeMode,
    pub debounce: Duration,
    /// Delay between a server restart and the page reload.
    pub browser_reload_delay: Duration,
    /// React to client asset changes (off with `--nosync`).
    pub watch_assets: bool,
}

impl CoordinatorOptions {
    pub fn from_config(cfg: &Config, mode: ServeMode, watch_assets: bool) -> Self {
        Self {
            mode,
            debounce: cfg.serve.debounce(),
            browser_reload_delay: cfg.serve.browser_reload_delay(),
            watch_assets,
        }
    }
}

/// Map a classified change to the Task Graph entry point it re-runs.
pub fn trigger_for(mode: ServeMode, kind: ChangeKind) -> Option<(&'static str, ReloadPolicy)> {
    match (mode, kind) {
        (_, ChangeKind::Server) => None,
        (ServeMode::Dev, ChangeKind::Style) => Some(("styles", ReloadPolicy::Stylesheet)),
        (ServeMode::Dev, ChangeKind::Script) => Some(("wiredep", ReloadPolicy::None)),
        (ServeMode::Dev, ChangeKind::Markup) => None,
        (ServeMode::Build, _) => Some(("optimize", ReloadPolicy::FullPage)),
    }
}

pub struct Coordinator {
    root: PathBuf,
    options: CoordinatorOptions,
    classifier: ChangeClassifier,
    runner: TaskRunner,
    reload: Arc<dyn ReloadChannel>,
    restarter: Option<Arc<dyn ServerRestarter>>,
    self_tx: mpsc::UnboundedSender<CoordinatorEvent>,

    queue: TriggerQueue,
    pending_server_changes: Vec<PathBuf>,
    /// End of the current debounce window.
    debounce_until: Option<Instant>,
    /// Post-restart reload deadline.
    reload_at: Option<Instant>,
    /// A post-restart reload fell due while a run was in flight.
    reload_after_run: bool,
    running: Option<String>,
    server_started: bool,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// `self_tx` must be the sender side of the channel later passed to
    /// [`run`](Self::run); finished runs report back through it.
    pub fn new(
        root: impl Into<PathBuf>,
        options: CoordinatorOptions,
        classifier: ChangeClassifier,
        runner: TaskRunner,
        reload: Arc<dyn ReloadChannel>,
        restarter: Option<Arc<dyn ServerRestarter>>,
        self_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    ) -> Self {
        Self {
            root: root.into(),
            options,
            classifier,
            runner,
            reload,
            restarter,
            self_tx,
            queue: TriggerQueue::new(),
            pending_server_changes: Vec::new(),
            debounce_until: None,
            reload_at: None,
            reload_after_run: false,
            running: None,
            server_started: false,
        }
    }

    /// Process events until [`CoordinatorEvent::Shutdown`] or until every
    /// sender is gone.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<CoordinatorEvent>) {
        info!(mode = ?self.options.mode, "watch coordinator started");

        loop {
            tokio::select! {
                event = inbox.recv() => match event {
                    Some(CoordinatorEvent::FilesChanged(paths)) => self.on_files_changed(paths),
                    Some(CoordinatorEvent::Supervisor(event)) => self.on_supervisor_event(event),
                    Some(CoordinatorEvent::RunFinished { trigger, result }) => {
                        self.on_run_finished(trigger, result);
                        self.maybe_start_run();
                    }
                    Some(CoordinatorEvent::Shutdown) | None => break,
                },

                _ = sleep_until(self.debounce_until.unwrap_or_else(Instant::now)), if self.debounce_until.is_some() => {
                    self.debounce_until = None;
                    self.flush_server_changes();
                    self.maybe_start_run();
                }

                _ = sleep_until(self.reload_at.unwrap_or_else(Instant::now)), if self.reload_at.is_some() => {
                    self.reload_at = None;
                    if self.running.is_some() {
                        debug!("post-restart reload waits for the in-flight run");
                        self.reload_after_run = true;
                    } else {
                        self.reload_after_restart();
                    }
                }
            }
        }

        if let Some(task) = &self.running {
            debug!(task = %task, "coordinator stopping with a run in flight");
        }
        info!("watch coordinator stopped");
    }

    fn on_files_changed(&mut self, paths: Vec<PathBuf>) {
        let mut scheduled = false;

        for path in paths {
            let Some(rel) = self.relative(&path) else {
                debug!(path = ?path, "change outside the project root; ignoring");
                continue;
            };

            for kind in self.classifier.classify(&rel) {
                if kind == ChangeKind::Server {
                    debug!(file = %rel, "server source changed");
                    self.pending_server_changes.push(PathBuf::from(&rel));
                    scheduled = true;
                    continue;
                }
                if !self.options.watch_assets {
                    continue;
                }
                if let Some((task, reload)) = trigger_for(self.options.mode, kind) {
                    debug!(file = %rel, task, "change triggers task");
                    self.queue
                        .record_trigger(Trigger::new(task, reload).with_files([PathBuf::from(&rel)]));
                    scheduled = true;
                }
            }
        }

        if scheduled {
            self.debounce_until = Some(Instant::now() + self.options.debounce);
        }
    }

    fn relative(&self, path: &Path) -> Option<String> {
        if path.is_relative() {
            return Some(path.to_string_lossy().replace('\\', "/"));
        }
        relative_str(&self.root, path)
    }

    fn flush_server_changes(&mut self) {
        if self.pending_server_changes.is_empty() {
            return;
        }
        let changed = std::mem::take(&mut self.pending_server_changes);
        match &self.restarter {
            Some(restarter) => {
                info!(files = changed.len(), "server sources changed; restarting server");
                restarter.restart(changed);
            }
            None => debug!("no supervised server; ignoring server source changes"),
        }
    }

    fn maybe_start_run(&mut self) {
        if self.running.is_some() || self.debounce_until.is_some() {
            return;
        }
        let Some(trigger) = self.queue.pop_next() else {
            return;
        };

        info!(task = %trigger.task, files = trigger.files.len(), "change detected; re-running task");
        self.running = Some(trigger.task.clone());

        let runner = self.runner.clone();
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            let result = runner.run(&trigger.task).await;
            let _ = tx.send(CoordinatorEvent::RunFinished { trigger, result });
        });
    }

    fn on_run_finished(&mut self, trigger: Trigger, result: Result<(), TaskError>) {
        self.running = None;

        match result {
            Ok(()) => match trigger.reload {
                ReloadPolicy::None => {
                    info!(task = %trigger.task, "rebuilt; reload the page to pick up script changes");
                }
                ReloadPolicy::Stylesheet => {
                    self.reload.reload_clients(ReloadOptions::stylesheets(trigger.files));
                }
                ReloadPolicy::FullPage => {
                    self.reload.reload_clients(ReloadOptions::full_page());
                }
            },
            Err(err) => {
                error!(task = %trigger.task, error = %err, "rebuild failed; waiting for the next change");
            }
        }

        if self.reload_after_run {
            self.reload_after_run = false;
            self.reload_after_restart();
        }
    }

    fn on_supervisor_event(&mut self, event: SupervisorEvent) {
        match &event {
            SupervisorEvent::Starting { restart } => debug!(restart, "server starting"),
            SupervisorEvent::Running { restart: false, .. } => {
                if !self.server_started {
                    self.server_started = true;
                    info!("server started; browser reload channel is live");
                }
            }
            SupervisorEvent::Running { restart: true, .. } => {
                info!(
                    delay_ms = self.options.browser_reload_delay.as_millis() as u64,
                    "server restarted; scheduling browser reload"
                );
                self.reload_at = Some(Instant::now() + self.options.browser_reload_delay);
            }
            SupervisorEvent::Crashed { code, reason } => {
                warn!(code = ?code, reason = %reason, "server crashed; save a server file to restart it");
            }
            SupervisorEvent::Exited => info!("server exited"),
        }
    }

    fn reload_after_restart(&self) {
        self.reload.notify(RESTART_RELOAD_MESSAGE);
        self.reload.reload_clients(ReloadOptions::full_page());
    }
}
