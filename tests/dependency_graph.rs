use taskgraph::dag::DependencyGraph;
use taskgraph::errors::DefinitionError;
use taskgraph_test_utils::builders::{TaskBuilder, WorkflowBuilder};

#[test]
fn ready_tasks_follow_workflow_order() {
    let wf = WorkflowBuilder::new("w")
        .task("c", "true")
        .with_task(TaskBuilder::new("b", "true").after(&["c"]))
        .task("a", "true")
        .build();

    let graph = DependencyGraph::build(&wf).unwrap();
    assert_eq!(graph.ready_tasks(), vec!["c", "a"]);
    assert_eq!(graph.len(), 3);
}

#[test]
fn diamond_unblocks_join_only_after_both_branches() {
    let wf = WorkflowBuilder::new("diamond")
        .task("root", "true")
        .with_task(TaskBuilder::new("left", "true").after(&["root"]))
        .with_task(TaskBuilder::new("right", "true").after(&["root"]))
        .with_task(TaskBuilder::new("join", "true").after(&["left", "right"]))
        .build();

    let mut graph = DependencyGraph::build(&wf).unwrap();
    assert_eq!(graph.ready_tasks(), vec!["root"]);
    assert_eq!(graph.mark_completed("root"), vec!["left", "right"]);
    assert!(graph.mark_completed("right").is_empty());
    assert_eq!(graph.mark_completed("left"), vec!["join"]);
    assert_eq!(graph.mark_completed("join"), Vec::<String>::new());
    assert_eq!(graph.completed_count(), 4);
    assert!(graph.remaining().is_empty());
}

#[test]
fn completing_twice_or_unknown_is_a_no_op() {
    let wf = WorkflowBuilder::new("w")
        .task("a", "true")
        .with_task(TaskBuilder::new("b", "true").after(&["a"]))
        .build();

    let mut graph = DependencyGraph::build(&wf).unwrap();
    assert_eq!(graph.mark_completed("a"), vec!["b"]);
    assert!(graph.mark_completed("a").is_empty());
    assert!(graph.mark_completed("ghost").is_empty());
    assert_eq!(graph.completed_count(), 1);
}

#[test]
fn workflow_level_links_merge_with_task_dependencies() {
    let wf = WorkflowBuilder::new("w")
        .task("a", "true")
        .task("b", "true")
        .with_task(TaskBuilder::new("c", "true").after(&["a"]))
        .link("c", "b")
        .link("c", "a")
        .build();

    assert_eq!(wf.effective_dependencies("c"), vec!["a", "b"]);

    let mut graph = DependencyGraph::build(&wf).unwrap();
    assert_eq!(graph.dependencies_of("c"), ["a", "b"]);
    assert_eq!(graph.ready_tasks(), vec!["a", "b"]);
    assert!(graph.mark_completed("a").is_empty());
    assert_eq!(graph.mark_completed("b"), vec!["c"]);
}

#[test]
fn unknown_dependency_is_rejected() {
    let wf = WorkflowBuilder::new("w")
        .with_task(TaskBuilder::new("a", "true").after(&["missing"]))
        .build();

    let err = DependencyGraph::build(&wf).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::UnknownDependency {
            workflow: "w".into(),
            task: "a".into(),
            dependency: "missing".into(),
        }
    );
}

#[test]
fn link_from_unknown_task_is_rejected() {
    // A `ghost_dependencies` link left behind after `ghost.md` was deleted.
    let wf = WorkflowBuilder::new("w")
        .task("a", "true")
        .link("ghost", "a")
        .build();

    let err = DependencyGraph::build(&wf).unwrap_err();
    assert_eq!(
        err,
        DefinitionError::UnknownTask {
            workflow: "w".into(),
            task: "ghost".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "workflow 'w': dependency declared for unknown task 'ghost'"
    );
}

#[test]
fn duplicate_task_is_rejected() {
    let wf = WorkflowBuilder::new("w")
        .task("a", "true")
        .task("a", "false")
        .build();

    assert!(matches!(
        DependencyGraph::build(&wf),
        Err(DefinitionError::DuplicateTask { task, .. }) if task == "a"
    ));
}

#[test]
fn cycle_reports_its_members() {
    let wf = WorkflowBuilder::new("loop")
        .task("entry", "true")
        .with_task(TaskBuilder::new("a", "true").after(&["c", "entry"]))
        .with_task(TaskBuilder::new("b", "true").after(&["a"]))
        .with_task(TaskBuilder::new("c", "true").after(&["b"]))
        .build();

    match DependencyGraph::build(&wf) {
        Err(DefinitionError::Cycle { workflow, members }) => {
            assert_eq!(workflow, "loop");
            assert_eq!(members, vec!["a", "b", "c"]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_a_one_member_cycle() {
    let wf = WorkflowBuilder::new("w")
        .with_task(TaskBuilder::new("a", "true").after(&["a"]))
        .build();

    match DependencyGraph::build(&wf) {
        Err(DefinitionError::Cycle { members, .. }) => assert_eq!(members, vec!["a"]),
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn error_messages_name_workflow_and_edge() {
    let err = DefinitionError::UnknownDependency {
        workflow: "w".into(),
        task: "a".into(),
        dependency: "x".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("'w'"));
    assert!(msg.contains("'a'"));
    assert!(msg.contains("'x'"));
}
