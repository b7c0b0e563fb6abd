// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::TaskError;

/// Future returned by a task action.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Side-effecting body of a task.
///
/// Actions must be safe to re-invoke: every run regenerates what the action
/// owns (clean-then-write), the executor never special-cases partial state.
pub trait TaskAction: Send + Sync {
    fn invoke(&self) -> ActionFuture;
}

impl<F, Fut> TaskAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn invoke(&self) -> ActionFuture {
        Box::pin(self())
    }
}

/// Action for tasks that only aggregate their prerequisites.
pub fn noop() -> impl TaskAction {
    || async { Ok::<(), anyhow::Error>(()) }
}

/// Internal node structure: prerequisites in declaration order plus the action.
struct TaskNode {
    deps: Vec<TaskName>,
    action: Arc<dyn TaskAction>,
}

/// Registry of named tasks and their prerequisites.
///
/// Registration order is kept so listings and validation are deterministic.
/// Call [`TaskGraph::validate`] (done by the runner before any run) to reject
/// unknown prerequisites and cycles.
#[derive(Default)]
pub struct TaskGraph {
    nodes: HashMap<TaskName, TaskNode>,
    order: Vec<TaskName>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.order)
            .finish_non_exhaustive()
    }
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Names are unique; prerequisites may be registered later.
    pub fn register<N, I, S, A>(&mut self, name: N, prerequisites: I, action: A) -> Result<(), TaskError>
    where
        N: Into<TaskName>,
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
        A: TaskAction + 'static,
    {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(TaskError::DuplicateTask(name));
        }

        let mut deps: Vec<TaskName> = Vec::new();
        for dep in prerequisites {
            let dep = dep.into();
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        self.order.push(name.clone());
        self.nodes.insert(
            name,
            TaskNode {
                deps,
                action: Arc::new(action),
            },
        );
        Ok(())
    }

    /// Task names in registration order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Immediate prerequisites of a task, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list it as a prerequisite).
    pub fn dependents_of(&self, name: &str) -> Vec<TaskName> {
        self.order
            .iter()
            .filter(|candidate| self.dependencies_of(candidate).iter().any(|d| d == name))
            .cloned()
            .collect()
    }

    pub(crate) fn action_of(&self, name: &str) -> Option<Arc<dyn TaskAction>> {
        self.nodes.get(name).map(|n| Arc::clone(&n.action))
    }

    /// The task plus everything it transitively requires.
    pub fn closure_of(&self, root: &str) -> Result<HashSet<TaskName>, TaskError> {
        if !self.contains(root) {
            return Err(TaskError::UnknownTask(root.to_string()));
        }

        let mut stack = vec![root.to_string()];
        let mut seen = HashSet::new();

        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            stack.extend(self.dependencies_of(&name).iter().cloned());
        }

        Ok(seen)
    }

    /// Check that every prerequisite exists and that the graph is acyclic.
    pub fn validate(&self) -> Result<(), TaskError> {
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                if !self.contains(dep) {
                    return Err(TaskError::UnknownTask(dep.clone()));
                }
            }
        }

        // Edge direction: task -> prerequisite, so a reported chain reads
        // "A requires B requires A".
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in &self.order {
            graph.add_node(name.as_str());
        }
        for name in &self.order {
            for dep in self.dependencies_of(name) {
                graph.add_edge(name.as_str(), dep.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(TaskError::CycleDetected(cycle_path(&graph, cycle.node_id()))),
        }
    }
}

/// Recover the offending chain through `start`, e.g. `[a, b, a]`.
fn cycle_path<'a>(graph: &DiGraphMap<&'a str, ()>, start: &'a str) -> Vec<TaskName> {
    let component: HashSet<&'a str> = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.contains(&start))
        .unwrap_or_default()
        .into_iter()
        .collect();

    let mut path = vec![start];
    let mut visited: HashSet<&'a str> = HashSet::from([start]);
    let mut frontier = vec![successors(graph, &component, start)];

    while let Some(candidates) = frontier.last_mut() {
        match candidates.pop() {
            Some(next) if next == start => {
                path.push(start);
                return path.into_iter().map(str::to_string).collect();
            }
            Some(next) => {
                if visited.insert(next) {
                    path.push(next);
                    frontier.push(successors(graph, &component, next));
                }
            }
            None => {
                frontier.pop();
                path.pop();
            }
        }
    }

    vec![start.to_string(), start.to_string()]
}

fn successors<'a>(
    graph: &DiGraphMap<&'a str, ()>,
    component: &HashSet<&'a str>,
    node: &'a str,
) -> Vec<&'a str> {
    let mut next: Vec<&'a str> = graph
        .neighbors(node)
        .filter(|n| component.contains(n))
        .collect();
    // Popped from the back: keep declaration order when exploring.
    next.reverse();
    next
}
