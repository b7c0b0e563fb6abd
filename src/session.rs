// src/session.rs

//! Watch Session: the filesystem subscription, the supervised server and the
//! coordinator, owned by one value.
//!
//! Created by [`WatchSession::start`], released by
//! [`WatchSession::shutdown`]. Dropping a session without shutting it down
//! still stops the coordinator, which in turn releases the supervisor and
//! kills the child.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::TaskRunner;
use crate::exec::{spawn_supervisor, ServerRestarter, SupervisorHandle, SupervisorOptions};
use crate::reload::ReloadChannel;
use crate::watch::coordinator::{
    Coordinator, CoordinatorEvent, CoordinatorOptions, ServeMode,
};
use crate::watch::patterns::ChangeClassifier;
use crate::watch::watcher::{spawn_watcher, WatcherHandle};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub mode: ServeMode,
    /// Skip asset watching (server restarts still happen).
    pub nosync: bool,
    /// Watch style sources only and run no server.
    pub styles_only: bool,
}

impl SessionOptions {
    pub fn serve(mode: ServeMode, nosync: bool) -> Self {
        Self {
            mode,
            nosync,
            styles_only: false,
        }
    }

    pub fn styles_only() -> Self {
        Self {
            mode: ServeMode::Dev,
            nosync: false,
            styles_only: true,
        }
    }
}

#[derive(Debug)]
pub struct WatchSession {
    coordinator_tx: mpsc::UnboundedSender<CoordinatorEvent>,
    coordinator: Option<JoinHandle<()>>,
    watcher: Option<WatcherHandle>,
    supervisor: Option<SupervisorHandle>,
}

impl WatchSession {
    /// Subscribe to the project tree, launch the server (unless styles-only)
    /// and start the coordinator.
    pub async fn start(
        config: Arc<Config>,
        runner: TaskRunner,
        reload: Arc<dyn ReloadChannel>,
        options: SessionOptions,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = spawn_watcher(config.root(), tx.clone())?;
        let (classifier, supervisor) = if options.styles_only {
            (ChangeClassifier::styles_only(&config)?, None)
        } else {
            let supervisor = spawn_supervisor(
                SupervisorOptions::from_config(&config, options.mode.build_mode()),
                tx.clone(),
            );
            (ChangeClassifier::from_config(&config)?, Some(supervisor))
        };
        let restarter = supervisor
            .as_ref()
            .map(|s| Arc::new(s.restarter()) as Arc<dyn ServerRestarter>);

        let coordinator = Coordinator::new(
            watcher.root().to_path_buf(),
            CoordinatorOptions::from_config(&config, options.mode, !options.nosync),
            classifier,
            runner,
            reload,
            restarter,
            tx.clone(),
        );
        let join = tokio::spawn(coordinator.run(rx));

        info!(
            mode = ?options.mode,
            nosync = options.nosync,
            styles_only = options.styles_only,
            port = config.port(),
            "watch session started"
        );

        Ok(Self {
            coordinator_tx: tx,
            coordinator: Some(join),
            watcher: Some(watcher),
            supervisor,
        })
    }

    /// Unsubscribe, stop the coordinator, then kill the server.
    pub async fn shutdown(mut self) {
        info!("shutting down watch session");

        drop(self.watcher.take());

        let _ = self.coordinator_tx.send(CoordinatorEvent::Shutdown);
        if let Some(join) = self.coordinator.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "coordinator ended abnormally");
            }
        }

        if let Some(supervisor) = self.supervisor.take() {
            supervisor.shutdown().await;
        }

        info!("watch session stopped");
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        if self.coordinator.is_some() {
            let _ = self.coordinator_tx.send(CoordinatorEvent::Shutdown);
        }
    }
}
