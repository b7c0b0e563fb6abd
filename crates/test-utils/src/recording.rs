#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use assetdag::dag::TaskAction;
use assetdag::exec::ServerRestarter;
use assetdag::reload::{ReloadChannel, ReloadMessage, ReloadOptions};
use tokio::sync::{mpsc, Notify};

/// Shared, ordered record of which task actions ran.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        self.entries.lock().unwrap().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|n| n == name)
    }
}

/// Action that records `name` and succeeds.
pub fn recording_action(log: &ActionLog, name: &str) -> impl TaskAction + 'static {
    let log = log.clone();
    let name = name.to_string();
    move || {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(&name);
            Ok::<(), anyhow::Error>(())
        }
    }
}

/// Action that records `name` and fails with `cause`.
pub fn failing_action(log: &ActionLog, name: &str, cause: &str) -> impl TaskAction + 'static {
    let log = log.clone();
    let name = name.to_string();
    let cause = cause.to_string();
    move || {
        let log = log.clone();
        let name = name.clone();
        let cause = cause.clone();
        async move {
            log.push(&name);
            Err::<(), anyhow::Error>(anyhow!(cause))
        }
    }
}

/// Action that records `name:start`, waits for one `gate` permit, then
/// records `name:finish` and succeeds.
pub fn gated_action(log: &ActionLog, name: &str, gate: Arc<Notify>) -> impl TaskAction + 'static {
    let log = log.clone();
    let name = name.to_string();
    move || {
        let log = log.clone();
        let name = name.clone();
        let gate = Arc::clone(&gate);
        async move {
            log.push(&format!("{name}:start"));
            gate.notified().await;
            log.push(&format!("{name}:finish"));
            Ok::<(), anyhow::Error>(())
        }
    }
}

/// Reload channel that keeps every message and forwards it to a receiver
/// tests can await on.
#[derive(Debug, Clone)]
pub struct RecordingReloadChannel {
    messages: Arc<Mutex<Vec<ReloadMessage>>>,
    tx: mpsc::UnboundedSender<ReloadMessage>,
}

impl RecordingReloadChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReloadMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                messages: Arc::new(Mutex::new(Vec::new())),
                tx,
            },
            rx,
        )
    }

    pub fn messages(&self) -> Vec<ReloadMessage> {
        self.messages.lock().unwrap().clone()
    }

    fn record(&self, message: ReloadMessage) {
        self.messages.lock().unwrap().push(message.clone());
        let _ = self.tx.send(message);
    }
}

impl ReloadChannel for RecordingReloadChannel {
    fn notify(&self, message: &str) {
        self.record(ReloadMessage::Notify {
            message: message.to_string(),
        });
    }

    fn reload_clients(&self, options: ReloadOptions) {
        self.record(options.into());
    }
}

/// Restarter that records each restart request.
#[derive(Debug, Clone)]
pub struct RecordingRestarter {
    requests: Arc<Mutex<Vec<Vec<PathBuf>>>>,
    tx: mpsc::UnboundedSender<Vec<PathBuf>>,
}

impl RecordingRestarter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<PathBuf>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                tx,
            },
            rx,
        )
    }

    pub fn requests(&self) -> Vec<Vec<PathBuf>> {
        self.requests.lock().unwrap().clone()
    }
}

impl ServerRestarter for RecordingRestarter {
    fn restart(&self, changed: Vec<PathBuf>) {
        self.requests.lock().unwrap().push(changed.clone());
        let _ = self.tx.send(changed);
    }
}
