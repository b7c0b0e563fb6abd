// src/watch/mod.rs

//! File watching and the Watch/Reload Coordinator.
//!
//! - [`patterns`] classifies changed paths (style, script, markup, server).
//! - [`watcher`] wires up the cross-platform filesystem watcher (`notify`).
//! - [`coordinator`] turns classified changes into serialized Task Graph runs,
//!   server restarts and browser reload notifications.

pub mod coordinator;
pub mod patterns;
pub mod watcher;

pub use coordinator::{
    trigger_for, Coordinator, CoordinatorEvent, CoordinatorOptions, ServeMode,
    RESTART_RELOAD_MESSAGE,
};
pub use patterns::{relative_str, ChangeClassifier, ChangeKind, WatchProfile};
pub use watcher::{spawn_watcher, WatcherHandle};
