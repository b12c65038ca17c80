// src/errors.rs

//! Crate-wide error types.
//!
//! Each layer has its own enum so callers can match on what went wrong:
//! - [`DefinitionError`]: a workflow cannot be scheduled at all.
//! - [`TaskExecError`]: a single task exhausted its attempts.
//! - [`WorkflowError`]: what a scheduler hands back to the apply driver.
//! - [`StoreError`]: reading or writing the state file.
//! - [`ParseError`]: turning the workflow directory tree into definitions.
//!
//! [`TaskgraphError`] wraps all of them for the binary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A workflow definition that can never be executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("workflow '{workflow}': task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        workflow: String,
        task: String,
        dependency: String,
    },

    #[error("workflow '{workflow}': dependency declared for unknown task '{task}'")]
    UnknownTask { workflow: String, task: String },

    #[error("workflow '{workflow}': task '{task}' is defined more than once")]
    DuplicateTask { workflow: String, task: String },

    #[error("workflow '{workflow}': dependency cycle between tasks [{}]", .members.join(", "))]
    Cycle {
        workflow: String,
        members: Vec<String>,
    },

    #[error(
        "workflow '{workflow}' is unschedulable: tasks [{}] never became ready",
        .remaining.join(", ")
    )]
    Unschedulable {
        workflow: String,
        remaining: Vec<String>,
    },
}

/// Terminal failure of a single task after its retry budget is spent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskExecError {
    #[error("command exited with code {code} after {attempts} attempt(s)")]
    Failed { attempts: u32, code: i32 },

    #[error("command could not be started after {attempts} attempt(s): {message}")]
    Spawn { attempts: u32, message: String },

    #[error("command timed out after {timeout:?} on attempt {attempts}")]
    TimedOut { attempts: u32, timeout: Duration },

    #[error("task cancelled during attempt {attempts}")]
    Cancelled { attempts: u32 },
}

/// Why a workflow did not complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("workflow '{workflow}': task '{task}' failed: {source}")]
    TaskFailed {
        workflow: String,
        task: String,
        #[source]
        source: TaskExecError,
    },

    #[error("workflow '{workflow}' was cancelled")]
    Cancelled { workflow: String },

    #[error("workflow '{workflow}' aborted: {reason}")]
    Aborted { workflow: String, reason: String },
}

impl WorkflowError {
    /// Name of the workflow this error belongs to.
    pub fn workflow(&self) -> &str {
        match self {
            WorkflowError::Definition(def) => match def {
                DefinitionError::UnknownDependency { workflow, .. }
                | DefinitionError::UnknownTask { workflow, .. }
                | DefinitionError::DuplicateTask { workflow, .. }
                | DefinitionError::Cycle { workflow, .. }
                | DefinitionError::Unschedulable { workflow, .. } => workflow,
            },
            WorkflowError::TaskFailed { workflow, .. } => workflow,
            WorkflowError::Cancelled { workflow } => workflow,
            WorkflowError::Aborted { workflow, .. } => workflow,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowError::Cancelled { .. })
    }
}

/// Failures of the persisted state store. Never retried.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read state file {path:?}: {cause:#}")]
    Read { path: PathBuf, cause: anyhow::Error },

    #[error("failed to parse state file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write state file {path:?}: {cause:#}")]
    Write { path: PathBuf, cause: anyhow::Error },
}

/// Failures while turning a directory tree into workflow definitions.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read workflow directory {path:?}: {cause:#}")]
    Walk { path: PathBuf, cause: anyhow::Error },

    #[error("failed to parse task {path:?}: {cause:#}")]
    Task { path: PathBuf, cause: anyhow::Error },

    #[error("failed to read dependency link {path:?}: {cause:#}")]
    Link { path: PathBuf, cause: anyhow::Error },
}

#[derive(Error, Debug)]
pub enum TaskgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(
        "apply did not complete: failed [{}], cancelled [{}]",
        .failed.join(", "),
        .cancelled.join(", ")
    )]
    ApplyFailed {
        failed: Vec<String>,
        cancelled: Vec<String>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TaskgraphError>;
