use std::sync::Arc;

use taskgraph::engine::Plan;
use taskgraph::errors::StoreError;
use taskgraph::fs::mock::MockFileSystem;
use taskgraph::fs::{FileSystem, RealFileSystem};
use taskgraph::state::{
    compute_diff, compute_task_changes, StateFile, StateStore, TaskChangeCounts, WorkflowState,
};
use taskgraph::types::{TaskStatus, WorkflowStatus};
use taskgraph_test_utils::builders::{completed_state, TaskBuilder, WorkflowBuilder};

#[test]
fn adding_a_task_updates_the_workflow() {
    let before = vec![WorkflowBuilder::new("w3").task("t1", "echo 1").build()];
    let persisted = completed_state(&before);

    let after = vec![WorkflowBuilder::new("w3")
        .task("t1", "echo 1")
        .task("t2", "echo 2")
        .build()];

    let diff = compute_diff(&persisted, &after);
    assert!(diff.added.is_empty());
    assert_eq!(diff.updated, vec!["w3"]);
    assert!(diff.removed.is_empty());

    let tasks = compute_task_changes(&persisted, &after);
    assert_eq!(
        tasks,
        TaskChangeCounts {
            added: 1,
            updated: 0,
            removed: 0
        }
    );
}

#[test]
fn identical_definitions_report_no_changes() {
    let workflows = vec![
        WorkflowBuilder::new("a")
            .task("x", "true")
            .with_task(TaskBuilder::new("y", "true").after(&["x"]).retries(2).timeout("5m"))
            .build(),
        WorkflowBuilder::new("b").task("z", "true").build(),
    ];
    let persisted = completed_state(&workflows);

    let plan = Plan::compute(&persisted, &workflows);
    assert!(!plan.has_changes());
    assert_eq!(plan, Plan::compute(&persisted, &workflows));
}

#[test]
fn dependency_order_does_not_matter() {
    let persisted = completed_state(&[WorkflowBuilder::new("w")
        .task("a", "true")
        .task("b", "true")
        .with_task(TaskBuilder::new("c", "true").after(&["a", "b"]))
        .build()]);

    let reordered = vec![WorkflowBuilder::new("w")
        .task("a", "true")
        .task("b", "true")
        .with_task(TaskBuilder::new("c", "true").after(&["b"]))
        .link("c", "a")
        .build()];

    assert!(compute_diff(&persisted, &reordered).is_empty());
}

#[test]
fn each_tracked_field_counts_as_an_update() {
    let base = WorkflowBuilder::new("w")
        .task("a", "true")
        .with_task(TaskBuilder::new("b", "echo").after(&["a"]))
        .build();
    let persisted = completed_state(&[base]);

    let variants = [
        TaskBuilder::new("b", "echo changed").after(&["a"]),
        TaskBuilder::new("b", "echo"),
        TaskBuilder::new("b", "echo").after(&["a"]).priority("high"),
        TaskBuilder::new("b", "echo").after(&["a"]).retries(1),
        TaskBuilder::new("b", "echo").after(&["a"]).timeout("1h"),
    ];

    for variant in variants {
        let wf = WorkflowBuilder::new("w").task("a", "true").with_task(variant).build();
        let changes = compute_task_changes(&persisted, std::slice::from_ref(&wf));
        assert_eq!(changes.updated, 1, "{:?}", wf.tasks[1]);
        assert_eq!(compute_diff(&persisted, &[wf]).updated, vec!["w"]);
    }
}

#[test]
fn ordering_is_deterministic() {
    let persisted = completed_state(&[
        WorkflowBuilder::new("old2").task("a", "true").task("b", "true").build(),
        WorkflowBuilder::new("keep").task("k", "true").build(),
        WorkflowBuilder::new("old1").task("c", "true").build(),
    ]);

    let new = vec![
        WorkflowBuilder::new("zeta").task("z", "true").build(),
        WorkflowBuilder::new("keep").task("k", "false").build(),
        WorkflowBuilder::new("alpha").task("x", "true").task("y", "true").build(),
    ];

    let diff = compute_diff(&persisted, &new);
    assert_eq!(diff.added, vec!["zeta", "alpha"]);
    assert_eq!(diff.updated, vec!["keep"]);
    assert_eq!(diff.removed, vec!["old2", "old1"]);

    // Tasks of added workflows count as added, of removed ones as removed.
    let tasks = compute_task_changes(&persisted, &new);
    assert_eq!(
        tasks,
        TaskChangeCounts {
            added: 3,
            updated: 1,
            removed: 3
        }
    );
}

#[test]
fn removing_a_task_updates_the_workflow() {
    let persisted = completed_state(&[WorkflowBuilder::new("w")
        .task("a", "true")
        .task("b", "true")
        .build()]);
    let new = vec![WorkflowBuilder::new("w").task("a", "true").build()];

    assert_eq!(compute_diff(&persisted, &new).updated, vec!["w"]);
    assert_eq!(compute_task_changes(&persisted, &new).removed, 1);
}

#[test]
fn missing_state_file_is_an_empty_store() {
    let store = StateStore::new(Arc::new(MockFileSystem::new()), "tgfs-state.json");
    assert_eq!(store.load().unwrap(), StateFile::default());
}

#[test]
fn garbage_state_file_is_a_parse_error() {
    let fs = MockFileSystem::new();
    fs.add_file("tgfs-state.json", "{ not json");
    let store = StateStore::new(Arc::new(fs), "tgfs-state.json");

    assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
}

#[test]
fn state_survives_a_round_trip_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("tgfs-state.json");
    let store = StateStore::new(Arc::new(RealFileSystem), &path);

    let workflows = vec![WorkflowBuilder::new("w")
        .task("a", "echo a")
        .with_task(TaskBuilder::new("b", "echo b").after(&["a"]).retries(1))
        .build()];
    let mut state = completed_state(&workflows);
    state.workflows[0].tasks[0].output = Some("a\n".into());
    state.workflows[0].tasks[0].duration = Some("12ms".into());

    store.save(&state).unwrap();
    assert_eq!(store.load().unwrap(), state);

    // No temporary file is left behind.
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"workflows\""));
    assert!(raw.contains("\"workflow_id\": \"w\""));
    assert!(raw.contains("\"status\": \"completed\""));
}

#[test]
fn saved_json_omits_empty_optional_fields() {
    let fs = MockFileSystem::new();
    let store = StateStore::new(Arc::new(fs.clone()), "s.json");
    let wf = WorkflowBuilder::new("w").task("a", "true").build();
    store
        .save(&StateFile {
            workflows: vec![WorkflowState::from_workflow(&wf)],
        })
        .unwrap();

    let raw = fs.read_to_string(std::path::Path::new("s.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let task = &json["workflows"][0]["tasks"][0];
    assert_eq!(task["status"], "pending");
    assert_eq!(task["attempts"], 0);
    assert!(task.get("output").is_none());
    assert!(task.get("error").is_none());
    assert!(task.get("duration").is_none());
}

#[test]
fn sparse_and_null_fields_load_with_defaults() {
    let fs = MockFileSystem::new();
    fs.add_file(
        "old.json",
        r#"{"workflows":[{"workflow_id":"w","status":"completed",
            "tasks":[{"id":"a","command":"true","dependencies":null,"status":"completed"}]}]}"#,
    );
    let state = StateStore::new(Arc::new(fs), "old.json").load().unwrap();

    let workflow = &state.workflows[0];
    assert_eq!(workflow.status, WorkflowStatus::Completed);
    let task = &workflow.tasks[0];
    assert!(task.dependencies.is_empty());
    assert_eq!(task.retries, 0);
    assert_eq!(task.attempts, 0);
    assert_eq!(task.status, TaskStatus::Completed);
}
