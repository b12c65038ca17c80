// src/workflow/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Task identifier, unique within its workflow.
pub type TaskId = String;

/// A single unit of work as parsed from disk. Immutable during a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    pub id: TaskId,
    /// File the task was parsed from, if any.
    pub source: Option<PathBuf>,
    /// Shell command, run through `sh -c`.
    pub command: String,
    pub dependencies: Vec<TaskId>,
    /// Advisory label; does not influence ordering.
    pub priority: String,
    /// Extra attempts after the first one; `0` runs the command once.
    pub retries: u32,
    /// Duration string such as `"30m"`. Empty or invalid means the default.
    pub timeout: String,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            ..Self::default()
        }
    }
}

/// A named, ordered collection of tasks plus their dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Workflow {
    /// Path-derived, unique across the definition tree.
    pub name: String,
    pub tasks: Vec<Task>,
    /// Task ID -> IDs of the tasks it depends on.
    pub dependencies: BTreeMap<TaskId, Vec<TaskId>>,
}

impl Workflow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.id.as_str())
    }

    /// Everything `id` waits for: the task's own `dependencies` merged with
    /// the workflow-level map entry, sorted and deduplicated.
    pub fn effective_dependencies(&self, id: &str) -> Vec<TaskId> {
        let mut deps: Vec<TaskId> = self
            .task(id)
            .map(|t| t.dependencies.clone())
            .unwrap_or_default();

        if let Some(extra) = self.dependencies.get(id) {
            deps.extend(extra.iter().cloned());
        }

        deps.sort();
        deps.dedup();
        deps
    }
}
