// src/engine/plan.rs

use crate::state::{compute_diff, compute_task_changes, StateFile, TaskChangeCounts, WorkflowDiff};
use crate::workflow::Workflow;

/// Read-only reconciliation result: what an apply would change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub workflows: WorkflowDiff,
    pub tasks: TaskChangeCounts,
}

impl Plan {
    pub fn compute(current: &StateFile, workflows: &[Workflow]) -> Self {
        Self {
            workflows: compute_diff(current, workflows),
            tasks: compute_task_changes(current, workflows),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.workflows.is_empty() || !self.tasks.is_empty()
    }
}
