// src/engine/mod.rs

//! Execution engine for the Task Graph.
//!
//! - [`runner`] executes one target per `run` call: it drives the per-run
//!   [`Scheduler`](crate::dag::Scheduler), runs independent actions
//!   concurrently and joins every prerequisite before a dependent starts.
//! - [`queue`] coalesces watch-triggered runs that arrive while another run
//!   is still in flight (debounce-then-drain).

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task action for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The action failed; carries the formatted cause chain.
    Failed(String),
}

pub mod queue;
pub mod runner;

pub use queue::{Trigger, TriggerQueue};
pub use runner::TaskRunner;
