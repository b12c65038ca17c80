mod common;

use std::sync::Arc;
use std::time::Duration;

use taskgraph::engine::WorkflowScheduler;
use taskgraph::errors::{DefinitionError, TaskExecError, WorkflowError};
use taskgraph::state::WorkflowState;
use taskgraph::types::{TaskStatus, WorkflowStatus};
use taskgraph::workflow::Workflow;
use taskgraph_test_utils::builders::{task_state, TaskBuilder, WorkflowBuilder};
use taskgraph_test_utils::fake_runner::{Behaviour, RunnerEvent, ScriptedRunner};
use tokio_util::sync::CancellationToken;

use common::{executor_with, init_tracing, with_timeout};

async fn run(
    workflow: Workflow,
    runner: &ScriptedRunner,
    max_workers: usize,
    cancel: &CancellationToken,
) -> (WorkflowState, Result<(), WorkflowError>) {
    let state = WorkflowState::from_workflow(&workflow);
    let mut scheduler =
        WorkflowScheduler::new(workflow, state, executor_with(Arc::new(runner.clone())), max_workers);
    let result = with_timeout(scheduler.run(cancel)).await;
    (scheduler.into_state(), result)
}

#[tokio::test]
async fn dependent_starts_only_after_its_dependency_completes() {
    init_tracing();
    let runner = ScriptedRunner::new().with_delay("A", Duration::from_millis(50));
    let wf = WorkflowBuilder::new("w1")
        .task("A", "echo a")
        .with_task(TaskBuilder::new("B", "echo b").after(&["A"]))
        .build();

    let (state, result) = run(wf, &runner, 4, &CancellationToken::new()).await;

    result.unwrap();
    assert_eq!(state.status, WorkflowStatus::Completed);
    assert_eq!(task_state(&state, "A").status, TaskStatus::Completed);
    assert_eq!(task_state(&state, "B").status, TaskStatus::Completed);

    let a_done = runner
        .position(|e| matches!(e, RunnerEvent::Finished { task, .. } if task == "A"))
        .unwrap();
    let b_start = runner
        .position(|e| matches!(e, RunnerEvent::Started { task, .. } if task == "B"))
        .unwrap();
    assert!(a_done < b_start);
}

#[tokio::test]
async fn single_failing_task_fails_the_workflow() {
    let runner = ScriptedRunner::new().always("bad", Behaviour::Fail(1));
    let wf = WorkflowBuilder::new("w2").task("bad", "exit 1").build();

    let (state, result) = run(wf, &runner, 4, &CancellationToken::new()).await;

    match result {
        Err(WorkflowError::TaskFailed { workflow, task, source }) => {
            assert_eq!(workflow, "w2");
            assert_eq!(task, "bad");
            assert_eq!(source, TaskExecError::Failed { attempts: 1, code: 1 });
        }
        other => panic!("expected task failure, got {other:?}"),
    }
    assert_eq!(state.status, WorkflowStatus::Failed);
    let bad = task_state(&state, "bad");
    assert_eq!(bad.status, TaskStatus::Failed);
    assert_eq!(bad.attempts, 1);
}

#[tokio::test]
async fn fail_fast_leaves_queued_pending_and_cancels_in_flight() {
    init_tracing();
    let runner = ScriptedRunner::new()
        .with_delay("bad", Duration::from_millis(20))
        .always("bad", Behaviour::Fail(1))
        .always("slow", Behaviour::Hang);
    let wf = WorkflowBuilder::new("ff")
        .task("bad", "exit 1")
        .task("slow", "sleep 100")
        .with_task(TaskBuilder::new("after_slow", "true").after(&["slow"]))
        .task("queued", "true")
        .build();

    // Two workers: `bad` and `slow` run, `queued` waits for a slot.
    let (state, result) = run(wf, &runner, 2, &CancellationToken::new()).await;

    assert!(matches!(result, Err(WorkflowError::TaskFailed { ref task, .. }) if task == "bad"));
    assert_eq!(state.status, WorkflowStatus::Failed);
    assert_eq!(task_state(&state, "bad").status, TaskStatus::Failed);
    assert_eq!(task_state(&state, "slow").status, TaskStatus::Cancelled);
    assert_eq!(task_state(&state, "after_slow").status, TaskStatus::Pending);
    assert_eq!(task_state(&state, "queued").status, TaskStatus::Pending);
    assert!(!runner.was_started("queued"));
    assert!(!runner.was_started("after_slow"));
}

#[tokio::test]
async fn timeout_triggers_fail_fast_too() {
    let runner = ScriptedRunner::new().always("slow", Behaviour::TimeOut);
    let wf = WorkflowBuilder::new("w")
        .with_task(TaskBuilder::new("slow", "sleep 9").timeout("30ms"))
        .with_task(TaskBuilder::new("next", "true").after(&["slow"]))
        .build();

    let (state, result) = run(wf, &runner, 4, &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(WorkflowError::TaskFailed { source: TaskExecError::TimedOut { .. }, .. })
    ));
    assert_eq!(task_state(&state, "slow").status, TaskStatus::Timeout);
    assert_eq!(task_state(&state, "next").status, TaskStatus::Pending);
    assert_eq!(state.status, WorkflowStatus::Failed);
}

#[tokio::test]
async fn caller_cancellation_yields_cancelled() {
    let runner = ScriptedRunner::new().always("hang", Behaviour::Hang);
    let wf = WorkflowBuilder::new("c")
        .task("hang", "sleep 100")
        .with_task(TaskBuilder::new("later", "true").after(&["hang"]))
        .build();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let (state, result) = run(wf, &runner, 4, &cancel).await;

    assert!(matches!(result, Err(WorkflowError::Cancelled { ref workflow }) if workflow == "c"));
    assert_eq!(state.status, WorkflowStatus::Cancelled);
    assert_eq!(task_state(&state, "hang").status, TaskStatus::Cancelled);
    assert_eq!(task_state(&state, "later").status, TaskStatus::Pending);
}

#[tokio::test]
async fn worker_pool_bounds_concurrency() {
    let runner = ScriptedRunner::new().with_default_delay(Duration::from_millis(30));
    let mut builder = WorkflowBuilder::new("wide");
    for i in 0..8 {
        builder = builder.task(&format!("t{i}"), "true");
    }

    let (state, result) = run(builder.build(), &runner, 3, &CancellationToken::new()).await;

    result.unwrap();
    assert_eq!(state.status, WorkflowStatus::Completed);
    assert!(runner.peak_concurrency() <= 3);
    assert!(runner.peak_concurrency() >= 2);
    assert_eq!(runner.started_order().len(), 8);
}

#[tokio::test]
async fn definition_error_fails_workflow_before_any_task_runs() {
    let runner = ScriptedRunner::new();
    let wf = WorkflowBuilder::new("broken")
        .task("a", "true")
        .with_task(TaskBuilder::new("b", "true").after(&["nope"]))
        .build();

    let (state, result) = run(wf, &runner, 4, &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(WorkflowError::Definition(DefinitionError::UnknownDependency { .. }))
    ));
    assert_eq!(state.status, WorkflowStatus::Failed);
    assert!(state.tasks.iter().all(|t| t.status == TaskStatus::Pending));
    assert!(runner.events().is_empty());
}

#[tokio::test]
async fn empty_workflow_completes() {
    let runner = ScriptedRunner::new();
    let (state, result) = run(Workflow::new("empty"), &runner, 4, &CancellationToken::new()).await;
    result.unwrap();
    assert_eq!(state.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn retried_task_still_unblocks_dependents() {
    let runner = ScriptedRunner::new().fail_times("flaky", 2);
    let wf = WorkflowBuilder::new("w")
        .with_task(TaskBuilder::new("flaky", "true").retries(2))
        .with_task(TaskBuilder::new("after", "true").after(&["flaky"]))
        .build();

    let (state, result) = run(wf, &runner, 4, &CancellationToken::new()).await;

    result.unwrap();
    assert_eq!(task_state(&state, "flaky").attempts, 3);
    assert_eq!(task_state(&state, "after").status, TaskStatus::Completed);
    assert_eq!(runner.started_order(), vec!["flaky", "after"]);
}
