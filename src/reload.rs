// src/reload.rs

//! Reload-notification channel.
//!
//! The core only ever produces messages into a [`ReloadChannel`]; whatever
//! serves the browsers subscribes to them. Connected clients are never
//! enumerated here.

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// What connected clients should do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadOptions {
    /// `true`: hot-swap the listed stylesheets. `false`: reload the page.
    pub stream: bool,
    pub files: Vec<PathBuf>,
}

impl ReloadOptions {
    pub fn full_page() -> Self {
        Self::default()
    }

    pub fn stylesheets(files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            stream: true,
            files: files.into_iter().collect(),
        }
    }
}

/// Producer side of the browser reload channel.
pub trait ReloadChannel: Send + Sync {
    /// Show a message in connected clients.
    fn notify(&self, message: &str);

    /// Ask connected clients to reload.
    fn reload_clients(&self, options: ReloadOptions);
}

/// Wire form of a reload notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    Notify { message: String },
    Reload { stream: bool, files: Vec<String> },
}

impl From<ReloadOptions> for ReloadMessage {
    fn from(options: ReloadOptions) -> Self {
        ReloadMessage::Reload {
            stream: options.stream,
            files: options
                .files
                .iter()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .collect(),
        }
    }
}

/// Fans reload messages out to any number of subscribers over a
/// `tokio::sync::broadcast` channel.
///
/// Sending with no subscriber is not an error; the message is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastReloadChannel {
    tx: broadcast::Sender<ReloadMessage>,
    start_path: String,
}

impl BroadcastReloadChannel {
    /// `start_path` is the page clients should open first (the index or the
    /// spec runner).
    pub fn new(capacity: usize, start_path: impl Into<String>) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            start_path: start_path.into(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    pub fn start_path(&self) -> &str {
        &self.start_path
    }

    fn send(&self, message: ReloadMessage) {
        match serde_json::to_string(&message) {
            Ok(json) => debug!(message = %json, "reload channel"),
            Err(err) => debug!(error = %err, "reload message not serializable"),
        }
        if self.tx.send(message).is_err() {
            debug!("no reload subscribers connected");
        }
    }
}

impl ReloadChannel for BroadcastReloadChannel {
    fn notify(&self, message: &str) {
        info!("{}", message);
        self.send(ReloadMessage::Notify {
            message: message.to_string(),
        });
    }

    fn reload_clients(&self, options: ReloadOptions) {
        info!(stream = options.stream, files = options.files.len(), "reloading browsers");
        self.send(options.into());
    }
}

/// Channel used with `--nosync`: notifications are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReloadChannel;

impl ReloadChannel for NullReloadChannel {
    fn notify(&self, message: &str) {
        debug!(message = %message, "reload channel disabled; dropping notification");
    }

    fn reload_clients(&self, options: ReloadOptions) {
        debug!(stream = options.stream, "reload channel disabled; dropping reload");
    }
}
