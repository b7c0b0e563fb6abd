// src/dag/task_info.rs

//! Per-run task state.

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunState {
    /// Part of this run, waiting on prerequisites.
    Pending,
    /// Action dispatched and not yet settled.
    Running,
    /// Action finished successfully in this run.
    Succeeded,
    /// Action returned an error in this run.
    Failed,
    /// Never invoked because a prerequisite failed.
    Blocked,
}

impl RunState {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::Blocked)
    }
}

/// Public, read-only view of a task's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not required by the current run.
    NotInRun,
    Pending,
    Running,
    Succeeded,
    Failed,
    Blocked,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::Succeeded) => TaskRunState::Succeeded,
            Some(RunState::Failed) => TaskRunState::Failed,
            Some(RunState::Blocked) => TaskRunState::Blocked,
        }
    }
}
