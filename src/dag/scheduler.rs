use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{RunState, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::TaskError;

/// Per-run state machine over the part of the graph a target requires.
///
/// It is responsible for:
/// - marking the target and everything it transitively requires `Pending`
///   (each task exactly once, however many paths reach it)
/// - deciding when a pending task is "ready" (all prerequisites succeeded)
/// - recording successes and failures
/// - blocking every dependent of a failed task without invoking it
///
/// It performs no IO; the runner feeds it completions.
#[derive(Debug)]
pub struct Scheduler {
    run_id: u64,
    target: TaskName,
    /// Tasks of this run in registration order (dispatch order for ties).
    order: Vec<TaskName>,
    deps: HashMap<TaskName, Vec<TaskName>>,
    dependents: HashMap<TaskName, Vec<TaskName>>,
    states: HashMap<TaskName, RunState>,
}

impl Scheduler {
    /// Prepare a run of `target` over a validated graph.
    pub fn for_target(graph: &TaskGraph, target: &str, run_id: u64) -> Result<Self, TaskError> {
        let closure = graph.closure_of(target)?;

        let order: Vec<TaskName> = graph
            .tasks()
            .filter(|name| closure.contains(*name))
            .map(str::to_string)
            .collect();

        let mut deps = HashMap::new();
        let mut dependents: HashMap<TaskName, Vec<TaskName>> = HashMap::new();
        let mut states = HashMap::new();

        for name in &order {
            let task_deps = graph.dependencies_of(name).to_vec();
            for dep in &task_deps {
                dependents.entry(dep.clone()).or_default().push(name.clone());
            }
            deps.insert(name.clone(), task_deps);
            states.insert(name.clone(), RunState::Pending);
        }

        debug!(run_id, target = %target, tasks = ?order, "scheduler: prepared run");

        Ok(Self {
            run_id,
            target: target.to_string(),
            order,
            deps,
            dependents,
            states,
        })
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Read-only view of the given task's run state.
    pub fn state_of(&self, task: &str) -> TaskRunState {
        self.states.get(task).copied().into()
    }

    /// Names of the tasks participating in this run, in registration order.
    pub fn tasks_in_run(&self) -> &[TaskName] {
        &self.order
    }

    /// Whether every prerequisite of `task` has succeeded in this run.
    ///
    /// Returns `None` if the task is not part of the run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let deps = self.deps.get(task)?;
        Some(
            deps.iter()
                .all(|dep| matches!(self.states.get(dep), Some(RunState::Succeeded))),
        )
    }

    /// True once every task of the run is in a terminal state.
    pub fn is_finished(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }

    /// Dispatch the initial wave: every task without prerequisites.
    pub fn start(&mut self) -> Vec<TaskName> {
        self.collect_new_ready_tasks()
    }

    /// Record the outcome of a running task and compute what follows.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        match self.states.get(task) {
            Some(RunState::Running) => {}
            other => {
                warn!(
                    task = %task,
                    run_id = self.run_id,
                    state = ?other,
                    "completion for a task that is not running; ignoring"
                );
                return SchedulerStep::default();
            }
        }

        let mut step = SchedulerStep::default();

        match outcome {
            TaskOutcome::Success => {
                self.states.insert(task.to_string(), RunState::Succeeded);
                debug!(task = %task, run_id = self.run_id, "task completed successfully");
                step.newly_scheduled = self.collect_new_ready_tasks();
            }
            TaskOutcome::Failed(ref cause) => {
                self.states.insert(task.to_string(), RunState::Failed);
                warn!(
                    task = %task,
                    run_id = self.run_id,
                    cause = %cause,
                    "task failed; blocking dependents in this run"
                );
                step.newly_blocked = self.mark_dependents_blocked(task);
                // Unrelated branches keep going; only dependents are blocked.
                step.newly_scheduled = self.collect_new_ready_tasks();
            }
        }

        step.run_just_finished = self.is_finished();
        if step.run_just_finished {
            info!(
                run_id = self.run_id,
                target = %self.target,
                "scheduler: all tasks terminal; run finished"
            );
        }
        step
    }

    /// Mark every pending transitive dependent of `failed` as `Blocked`.
    fn mark_dependents_blocked(&mut self, failed: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.dependents.get(failed).cloned().unwrap_or_default();
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            if let Some(state) = self.states.get_mut(&name) {
                if *state == RunState::Pending {
                    *state = RunState::Blocked;
                    debug!(
                        task = %name,
                        run_id = self.run_id,
                        "marking dependent as Blocked due to upstream failure"
                    );
                    newly_blocked.push(name.clone());
                    stack.extend(self.dependents.get(&name).cloned().unwrap_or_default());
                }
            }
        }

        newly_blocked
    }

    /// Collect tasks that are `Pending` and whose prerequisites all
    /// succeeded, mark them as `Running`, and return them.
    fn collect_new_ready_tasks(&mut self) -> Vec<TaskName> {
        // Decide first, then mutate to avoid borrowing issues.
        let ready: Vec<TaskName> = self
            .order
            .iter()
            .filter(|name| matches!(self.states.get(*name), Some(RunState::Pending)))
            .filter(|name| self.deps_satisfied(name).unwrap_or(false))
            .cloned()
            .collect();

        for name in &ready {
            debug!(
                task = %name,
                run_id = self.run_id,
                "prerequisites satisfied; marking Running"
            );
            self.states.insert(name.clone(), RunState::Running);
        }

        ready
    }
}
