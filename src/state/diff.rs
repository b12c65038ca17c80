// src/state/diff.rs

//! Reconciliation: persisted state vs. freshly parsed definitions.
//!
//! Pure functions; nothing here touches the filesystem or runs tasks, so
//! computing a diff twice gives the same answer.

use std::collections::HashSet;

use crate::workflow::{Task, Workflow};

use super::model::{StateFile, TaskState, WorkflowState};

/// Workflow names grouped by change kind.
///
/// `added` and `updated` follow the order of the new definitions, `removed`
/// the order of the persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowDiff {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl WorkflowDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Task-level change counts across all workflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChangeCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl TaskChangeCounts {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

pub fn compute_diff(current: &StateFile, workflows: &[Workflow]) -> WorkflowDiff {
    let mut diff = WorkflowDiff::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for workflow in workflows {
        if !seen.insert(workflow.name.as_str()) {
            continue;
        }
        match current.workflow(&workflow.name) {
            None => diff.added.push(workflow.name.clone()),
            Some(existing) if workflow_has_changes(existing, workflow) => {
                diff.updated.push(workflow.name.clone())
            }
            Some(_) => {}
        }
    }

    for existing in &current.workflows {
        if !seen.contains(existing.workflow_id.as_str())
            && !diff.removed.contains(&existing.workflow_id)
        {
            diff.removed.push(existing.workflow_id.clone());
        }
    }

    diff
}

pub fn compute_task_changes(current: &StateFile, workflows: &[Workflow]) -> TaskChangeCounts {
    let mut counts = TaskChangeCounts::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for workflow in workflows {
        if !seen.insert(workflow.name.as_str()) {
            continue;
        }
        let Some(existing) = current.workflow(&workflow.name) else {
            counts.added += workflow.tasks.len();
            continue;
        };

        for task in &workflow.tasks {
            match existing.task(&task.id) {
                None => counts.added += 1,
                Some(state) => {
                    if task_has_changes(task, &workflow.effective_dependencies(&task.id), state) {
                        counts.updated += 1;
                    }
                }
            }
        }
        counts.removed += existing
            .tasks
            .iter()
            .filter(|t| workflow.task(&t.id).is_none())
            .count();
    }

    let mut removed_seen: HashSet<&str> = HashSet::new();
    for existing in &current.workflows {
        if !seen.contains(existing.workflow_id.as_str())
            && removed_seen.insert(existing.workflow_id.as_str())
        {
            counts.removed += existing.tasks.len();
        }
    }

    counts
}

/// True when any task was added, removed or changed.
pub fn workflow_has_changes(current: &WorkflowState, workflow: &Workflow) -> bool {
    if current.tasks.len() != workflow.tasks.len() {
        return true;
    }

    let removed = current.tasks.iter().any(|t| workflow.task(&t.id).is_none());
    if removed {
        return true;
    }

    workflow.tasks.iter().any(|task| match current.task(&task.id) {
        None => true,
        Some(state) => task_has_changes(task, &workflow.effective_dependencies(&task.id), state),
    })
}

/// Compare one definition with its persisted snapshot. Dependencies are
/// compared as sets.
pub fn task_has_changes(task: &Task, dependencies: &[String], current: &TaskState) -> bool {
    task.command != current.command
        || task.priority != current.priority
        || task.retries != current.retries
        || task.timeout.trim() != current.timeout.trim()
        || as_set(dependencies) != as_set(&current.dependencies)
}

fn as_set(items: &[String]) -> HashSet<&str> {
    items.iter().map(String::as_str).collect()
}
