// src/dag/mod.rs

//! Task Graph representation and per-run scheduling.
//!
//! - [`graph`] holds the registry of named tasks, their prerequisites and
//!   actions, and validates it (unknown prerequisites, cycles).
//! - [`scheduler`] contains the per-run state machine that decides which
//!   tasks are ready to run, and which dependents are blocked by a failure.
//! - [`task_info`] provides the per-run task states.
//! - [`scheduler_step`] defines the result type for scheduler steps.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod task_info;

pub use graph::{noop, ActionFuture, TaskAction, TaskGraph};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::TaskRunState;
