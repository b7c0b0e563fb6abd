// src/errors.rs

//! Crate-wide error types.
//!
//! - [`AssetdagError`] is what the CLI surfaces.
//! - [`TaskError`] is what a Task Graph run reports.
//! - [`TestRunnerFailure`] is what the test orchestrator reports.

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    TestRunner(#[from] TestRunnerFailure),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a Task Graph run or of graph validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task's own action returned an error.
    #[error("task '{0}' failed: {1}")]
    ActionFailed(TaskName, String),

    /// The task was not invoked because one of its prerequisites failed.
    #[error("task '{0}' skipped: a prerequisite failed")]
    PrerequisiteFailed(TaskName),

    /// The graph contains a cycle; the chain starts and ends with the same task.
    #[error("cycle detected in task graph: {}", .0.join(" -> "))]
    CycleDetected(Vec<TaskName>),

    #[error("unknown task: {0}")]
    UnknownTask(TaskName),

    #[error("task registered twice: {0}")]
    DuplicateTask(TaskName),
}

impl TaskError {
    /// Name of the task this error is about (for cycles, the first task of the chain).
    pub fn task(&self) -> Option<&str> {
        match self {
            TaskError::ActionFailed(name, _)
            | TaskError::PrerequisiteFailed(name)
            | TaskError::UnknownTask(name)
            | TaskError::DuplicateTask(name) => Some(name),
            TaskError::CycleDetected(path) => path.first().map(|s| s.as_str()),
        }
    }
}

/// Outcome of a test-runner invocation that did not pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TestRunnerFailure {
    #[error("test runner: tests failed with code {status}")]
    Failed { status: i32 },

    #[error("test runner could not be started: {0}")]
    Spawn(String),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
