// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::coordinator::CoordinatorEvent;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping it unsubscribes.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

/// Watch `root` recursively and forward content changes to the coordinator
/// as [`CoordinatorEvent::FilesChanged`].
///
/// Access-only events are dropped; everything else (create, modify, remove,
/// rename) is forwarded with its paths.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    coordinator_tx: mpsc::UnboundedSender<CoordinatorEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Called synchronously on notify's thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) || event.paths.is_empty() {
                    return;
                }
                debug!(?event, "received notify event");
                if coordinator_tx
                    .send(CoordinatorEvent::FilesChanged(event.paths))
                    .is_err()
                {
                    debug!("coordinator gone; dropping file event");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("file watcher started on {:?}", root);

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}
