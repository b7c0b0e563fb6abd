// src/engine/queue.rs

use std::path::PathBuf;

use tracing::debug;

use crate::engine::TaskName;
use crate::types::ReloadPolicy;

/// A request to re-run one Task Graph entry point because files changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub task: TaskName,
    /// Notification to emit once the run has finished successfully.
    pub reload: ReloadPolicy,
    /// Changed files that caused the trigger (relative to the project root).
    pub files: Vec<PathBuf>,
}

impl Trigger {
    pub fn new(task: impl Into<TaskName>, reload: ReloadPolicy) -> Self {
        Self {
            task: task.into(),
            reload,
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.files.extend(files);
        self
    }
}

/// Triggers waiting for the next run.
///
/// Semantics:
/// - Triggers for the same task coalesce into one entry: the strongest reload
///   policy wins and the changed files are merged.
/// - Distinct tasks keep their first-arrival order.
/// - The coordinator takes the next trigger with
///   [`pop_next`](TriggerQueue::pop_next) only when no run is in flight, so
///   a task subtree is never rebuilt by two overlapping runs. Triggers that
///   arrive meanwhile keep merging into the waiting entries.
#[derive(Debug, Default)]
pub struct TriggerQueue {
    pending: Vec<Trigger>,
}

impl TriggerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Remember a trigger for the next run, merging it with an existing
    /// trigger for the same task.
    pub fn record_trigger(&mut self, trigger: Trigger) {
        match self.pending.iter_mut().find(|t| t.task == trigger.task) {
            Some(existing) => {
                existing.reload = existing.reload.max(trigger.reload);
                for file in trigger.files {
                    if !existing.files.contains(&file) {
                        existing.files.push(file);
                    }
                }
                debug!(task = %existing.task, "merged trigger into queued entry");
            }
            None => {
                debug!(task = %trigger.task, "queued new trigger");
                self.pending.push(trigger);
            }
        }
    }

    /// Take the oldest queued trigger.
    pub fn pop_next(&mut self) -> Option<Trigger> {
        if self.pending.is_empty() {
            return None;
        }
        let next = self.pending.remove(0);
        debug!(task = %next.task, remaining = self.pending.len(), "dequeued trigger");
        Some(next)
    }
}
