// src/engine/runner.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info, warn};

use crate::dag::{Scheduler, TaskGraph, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::TaskError;

/// Executes targets of a validated [`TaskGraph`].
///
/// Each [`run`](TaskRunner::run) gets a fresh [`Scheduler`], so prerequisites
/// are memoized within one run and re-executed by the next. Independent
/// actions run concurrently on the Tokio runtime; a task starts only after all
/// of its prerequisites have succeeded.
///
/// Cheap to clone; clones share the graph and the run counter.
#[derive(Clone)]
pub struct TaskRunner {
    graph: Arc<TaskGraph>,
    run_counter: Arc<AtomicU64>,
}

impl fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRunner")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    /// Validate the graph (unknown prerequisites, cycles) and wrap it.
    ///
    /// Nothing is executed if validation fails.
    pub fn new(graph: TaskGraph) -> Result<Self, TaskError> {
        graph.validate()?;
        Ok(Self {
            graph: Arc::new(graph),
            run_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Run `target` and everything it transitively requires.
    ///
    /// On failure the first failing action is reported as
    /// [`TaskError::ActionFailed`]; its dependents are never invoked. Tasks
    /// on unrelated branches that were already running are awaited.
    pub async fn run(&self, target: &str) -> Result<(), TaskError> {
        let run_id = self.run_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut scheduler = Scheduler::for_target(&self.graph, target, run_id)?;

        info!(run_id, target = %target, "starting run");
        let started = Instant::now();

        let mut in_flight: JoinSet<TaskOutcome> = JoinSet::new();
        let mut names: HashMap<Id, TaskName> = HashMap::new();
        let mut first_failure: Option<TaskError> = None;

        let ready = scheduler.start();
        self.dispatch(ready, run_id, &mut in_flight, &mut names);

        while let Some(joined) = in_flight.join_next_with_id().await {
            let (name, outcome) = match joined {
                Ok((id, outcome)) => (names.remove(&id).unwrap_or_default(), outcome),
                Err(err) => {
                    let name = names.remove(&err.id()).unwrap_or_default();
                    (name, TaskOutcome::Failed(format!("action aborted: {err}")))
                }
            };

            if let TaskOutcome::Failed(cause) = &outcome {
                if first_failure.is_none() {
                    first_failure = Some(TaskError::ActionFailed(name.clone(), cause.clone()));
                }
            }

            let step = scheduler.handle_completion(&name, outcome);
            for blocked in &step.newly_blocked {
                warn!(task = %blocked, run_id, failed = %name, "not started: prerequisite failed");
            }
            self.dispatch(step.newly_scheduled, run_id, &mut in_flight, &mut names);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Some(err) = first_failure {
            error!(run_id, target = %target, elapsed_ms, error = %err, "run failed");
            return Err(err);
        }

        match scheduler.state_of(target) {
            TaskRunState::Succeeded => {
                info!(run_id, target = %target, elapsed_ms, "run finished");
                Ok(())
            }
            state => {
                // Only reachable if the graph changed under us.
                error!(run_id, target = %target, ?state, "run ended without settling its target");
                Err(TaskError::PrerequisiteFailed(target.to_string()))
            }
        }
    }

    fn dispatch(
        &self,
        ready: Vec<TaskName>,
        run_id: u64,
        in_flight: &mut JoinSet<TaskOutcome>,
        names: &mut HashMap<Id, TaskName>,
    ) {
        for name in ready {
            let Some(action) = self.graph.action_of(&name) else {
                warn!(task = %name, run_id, "no action registered; skipping");
                continue;
            };

            let task = name.clone();
            let handle = in_flight.spawn(async move {
                let started = Instant::now();
                info!(task = %task, run_id, "starting task");

                match action.invoke().await {
                    Ok(()) => {
                        info!(
                            task = %task,
                            run_id,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "finished task"
                        );
                        TaskOutcome::Success
                    }
                    Err(err) => {
                        let cause = format!("{err:#}");
                        error!(task = %task, run_id, error = %cause, "task action failed");
                        TaskOutcome::Failed(cause)
                    }
                }
            });

            debug!(task = %name, run_id, "dispatched task");
            names.insert(handle.id(), name);
        }
    }
}
