// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready to run as a result of this step (already
    /// marked `Running`).
    pub newly_scheduled: Vec<TaskName>,
    /// Dependents newly marked `Blocked` because a prerequisite failed.
    pub newly_blocked: Vec<TaskName>,
    /// Whether this step settled the last task of the run.
    pub run_just_finished: bool,
}
