// tests/property_task_graph.rs

use std::collections::HashSet;

use assetdag::dag::TaskGraph;
use assetdag::engine::TaskRunner;
use assetdag_test_utils::recording::{recording_action, ActionLog};
use proptest::prelude::*;

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, deps)| {
                    let mut valid: Vec<usize> = deps
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect();
                    valid.sort();
                    valid.dedup();
                    valid
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

proptest! {
    #[test]
    fn run_executes_each_required_task_once_after_its_prerequisites(
        deps in dag_strategy(10),
        target_seed in any::<usize>(),
    ) {
        let log = ActionLog::new();
        let mut graph = TaskGraph::new();
        for (i, task_deps) in deps.iter().enumerate() {
            graph
                .register(name(i), task_deps.iter().map(|d| name(*d)), recording_action(&log, &name(i)))
                .unwrap();
        }

        let target = name(target_seed % deps.len());
        let closure = graph.closure_of(&target).unwrap();
        let runner = TaskRunner::new(graph).unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(runner.run(&target)).unwrap();

        let executed = log.entries();
        let executed_set: HashSet<String> = executed.iter().cloned().collect();
        prop_assert_eq!(executed.len(), executed_set.len(), "a task ran twice: {:?}", executed);
        prop_assert_eq!(&executed_set, &closure);

        for (i, task_deps) in deps.iter().enumerate() {
            let Some(pos) = log.position(&name(i)) else { continue };
            for d in task_deps {
                let dep_pos = log.position(&name(*d));
                prop_assert!(dep_pos.is_some_and(|p| p < pos), "{} ran before its prerequisite {}", name(i), name(*d));
            }
        }
    }
}
