use taskgraph::engine::{ApplyReport, Plan};
use taskgraph::errors::{TaskExecError, WorkflowError};
use taskgraph::output::{render_apply_summary, render_plan};
use taskgraph::state::StateFile;
use taskgraph::types::{TaskStatus, WorkflowStatus};
use taskgraph_test_utils::builders::{completed_state, TaskBuilder, WorkflowBuilder};

#[test]
fn renders_additions_updates_and_removals() {
    let persisted = completed_state(&[
        WorkflowBuilder::new("keep")
            .task("a", "echo old")
            .task("gone", "true")
            .build(),
        WorkflowBuilder::new("retired").task("r", "true").build(),
    ]);
    let workflows = vec![
        WorkflowBuilder::new("keep")
            .task("a", "echo new")
            .with_task(TaskBuilder::new("b", "echo b").after(&["a"]))
            .build(),
        WorkflowBuilder::new("fresh").task("f", "echo \"quoted\"").build(),
    ];

    let plan = Plan::compute(&persisted, &workflows);
    let out = render_plan(&plan, &workflows, &persisted);

    assert!(out.contains("  + \"workflows[fresh]\" {"));
    assert!(out.contains(r#""command": "echo \"quoted\"""#));
    assert!(out.contains("  ~ \"workflows[keep]\" {"));
    assert!(out.contains(r#""command": "echo old" -> "echo new""#));
    assert!(out.contains("+ \"tasks[b]\" {"));
    assert!(out.contains(r#""dependencies": ["a"]"#));
    assert!(out.contains("- \"tasks[gone]\" {"));
    assert!(out.contains("  - \"workflows[retired]\" {"));
    assert!(out.contains("- Workflows: 1 to add, 1 to update, 1 to remove."));
    assert!(out.contains("- Tasks: 2 to add, 1 to update, 2 to remove."));
}

#[test]
fn empty_plan_says_so() {
    let workflows = vec![WorkflowBuilder::new("w").task("a", "true").build()];
    let persisted = completed_state(&workflows);
    let plan = Plan::compute(&persisted, &workflows);

    let out = render_plan(&plan, &workflows, &persisted);
    assert!(out.contains("No changes."));
    assert!(out.contains("- Workflows: 0 to add, 0 to update, 0 to remove."));
    assert!(!out.contains("taskgraph apply"));
}

#[test]
fn apply_summary_lists_unfinished_tasks() {
    let workflows = vec![
        WorkflowBuilder::new("ok").task("a", "true").build(),
        WorkflowBuilder::new("ko").task("x", "false").task("y", "true").build(),
    ];
    let mut state = completed_state(&workflows);
    state.workflows[1].status = WorkflowStatus::Failed;
    state.workflows[1].tasks[0].status = TaskStatus::Failed;
    state.workflows[1].tasks[0].error = Some("command exited with code 1 after 1 attempt(s)".into());
    state.workflows[1].tasks[1].status = TaskStatus::Pending;

    let report = ApplyReport {
        state,
        errors: vec![WorkflowError::TaskFailed {
            workflow: "ko".into(),
            task: "x".into(),
            source: TaskExecError::Failed { attempts: 1, code: 1 },
        }],
    };

    let out = render_apply_summary(&report);
    assert!(out.contains("+ ok: completed (1/1 tasks completed)"));
    assert!(out.contains("x ko: failed (0/2 tasks completed)"));
    assert!(out.contains("x: failed (command exited with code 1"));
    assert!(out.contains("y: pending"));
    assert!(out.contains("1 failed and 0 cancelled"));

    let ok = ApplyReport {
        state: StateFile::default(),
        errors: Vec::new(),
    };
    assert!(render_apply_summary(&ok).contains("Apply complete!"));
}
