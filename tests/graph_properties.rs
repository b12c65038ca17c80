use std::collections::HashSet;

use proptest::prelude::*;
use taskgraph::dag::DependencyGraph;
use taskgraph::state::{compute_diff, compute_task_changes, StateFile};
use taskgraph::workflow::Workflow;
use taskgraph_test_utils::builders::{completed_state, TaskBuilder, WorkflowBuilder};

// Acyclic by construction: task N may only depend on tasks 0..N-1.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Workflow> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(move |raw_deps| {
            let mut builder = WorkflowBuilder::new("prop");
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let deps: Vec<String> = if i == 0 {
                    Vec::new()
                } else {
                    potential
                        .into_iter()
                        .map(|d| format!("t{}", d % i))
                        .collect::<HashSet<_>>()
                        .into_iter()
                        .collect()
                };
                let dep_refs: Vec<&str> = deps.iter().map(String::as_str).collect();
                builder = builder.with_task(
                    TaskBuilder::new(&format!("t{i}"), &format!("echo {i}")).after(&dep_refs),
                );
            }
            builder.build()
        })
    })
}

proptest! {
    #[test]
    fn every_task_unblocks_once_and_only_after_its_dependencies(
        wf in dag_strategy(12),
        picks in proptest::collection::vec(any::<usize>(), 64),
    ) {
        let mut graph = DependencyGraph::build(&wf).unwrap();
        let mut ready: Vec<String> = graph.ready_tasks();
        let mut done: HashSet<String> = HashSet::new();
        let mut released: HashSet<String> = ready.iter().cloned().collect();
        let mut step = 0;

        while !ready.is_empty() {
            // Complete ready tasks in an arbitrary order.
            let pick = picks[step % picks.len()] % ready.len();
            step += 1;
            let task = ready.remove(pick);

            for dep in wf.effective_dependencies(&task) {
                prop_assert!(done.contains(&dep), "{task} ran before {dep}");
            }
            done.insert(task.clone());

            for unblocked in graph.mark_completed(&task) {
                prop_assert!(released.insert(unblocked.clone()), "{unblocked} released twice");
                ready.push(unblocked);
            }
        }

        prop_assert_eq!(done.len(), wf.tasks.len());
        prop_assert_eq!(graph.completed_count(), wf.tasks.len());
    }

    #[test]
    fn diff_is_idempotent_and_empty_against_its_own_snapshot(
        wfs in proptest::collection::vec(dag_strategy(5), 0..4),
    ) {
        let workflows: Vec<Workflow> = wfs
            .into_iter()
            .enumerate()
            .map(|(i, mut w)| { w.name = format!("wf{i}"); w })
            .collect();

        let empty = StateFile::default();
        let first = compute_diff(&empty, &workflows);
        prop_assert_eq!(&first, &compute_diff(&empty, &workflows));
        prop_assert_eq!(first.added.len(), workflows.len());

        let snapshot = completed_state(&workflows);
        let again = compute_diff(&snapshot, &workflows);
        prop_assert!(again.is_empty());
        prop_assert!(compute_task_changes(&snapshot, &workflows).is_empty());
    }
}
