#![allow(dead_code)]

use taskgraph::state::{StateFile, TaskState, WorkflowState};
use taskgraph::types::{TaskStatus, WorkflowStatus};
use taskgraph::workflow::{Task, Workflow};

/// Builder for `Workflow` to simplify test setup.
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow::new(name),
        }
    }

    pub fn with_task(mut self, task: TaskBuilder) -> Self {
        self.workflow.tasks.push(task.build());
        self
    }

    /// Shorthand for a task running `command` with no extras.
    pub fn task(self, id: &str, command: &str) -> Self {
        self.with_task(TaskBuilder::new(id, command))
    }

    /// Workflow-level edge, as a `<task>_dependencies` symlink would add.
    pub fn link(mut self, task: &str, dependency: &str) -> Self {
        self.workflow
            .dependencies
            .entry(task.to_string())
            .or_default()
            .push(dependency.to_string());
        self
    }

    pub fn build(self) -> Workflow {
        self.workflow
    }
}

/// Builder for `Task`.
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new(id: &str, command: &str) -> Self {
        Self {
            task: Task::new(id, command),
        }
    }

    pub fn after(mut self, deps: &[&str]) -> Self {
        self.task.dependencies = deps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.task.retries = retries;
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.task.timeout = timeout.to_string();
        self
    }

    pub fn priority(mut self, priority: &str) -> Self {
        self.task.priority = priority.to_string();
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

/// Persisted state as a successful apply of `workflows` would leave it.
pub fn completed_state(workflows: &[Workflow]) -> StateFile {
    StateFile {
        workflows: workflows
            .iter()
            .map(|w| {
                let mut state = WorkflowState::from_workflow(w);
                state.status = WorkflowStatus::Completed;
                for task in &mut state.tasks {
                    task.status = TaskStatus::Completed;
                    task.attempts = 1;
                }
                state
            })
            .collect(),
    }
}

/// Look up a task state, panicking with a readable message when missing.
pub fn task_state<'a>(state: &'a WorkflowState, id: &str) -> &'a TaskState {
    state
        .task(id)
        .unwrap_or_else(|| panic!("no task '{id}' in workflow '{}'", state.workflow_id))
}
