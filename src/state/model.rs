// src/state/model.rs

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{TaskStatus, WorkflowStatus};
use crate::workflow::{Task, Workflow};

/// Root of the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub workflows: Vec<WorkflowState>,
}

impl StateFile {
    pub fn workflow(&self, id: &str) -> Option<&WorkflowState> {
        self.workflows.iter().find(|w| w.workflow_id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_id: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<TaskState>,
}

impl WorkflowState {
    /// Fresh `pending` state for every task of `workflow`, with effective
    /// dependencies resolved.
    pub fn from_workflow(workflow: &Workflow) -> Self {
        Self {
            workflow_id: workflow.name.clone(),
            status: WorkflowStatus::Pending,
            tasks: workflow
                .tasks
                .iter()
                .map(|t| TaskState::from_task(t, workflow.effective_dependencies(&t.id)))
                .collect(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&TaskState> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Definition snapshot plus outcome of one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub id: String,
    #[serde(default)]
    pub command: String,
    /// Effective dependency set, sorted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Executions started during the apply that wrote this state.
    #[serde(default)]
    pub attempts: u32,
}

impl TaskState {
    pub fn from_task(task: &Task, dependencies: Vec<String>) -> Self {
        Self {
            id: task.id.clone(),
            command: task.command.clone(),
            dependencies,
            priority: task.priority.clone(),
            retries: task.retries,
            timeout: task.timeout.clone(),
            ..Self::default()
        }
    }
}

/// Older state files wrote `null` for empty lists.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
