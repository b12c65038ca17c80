// src/state/mod.rs

//! Persisted execution state and reconciliation.
//!
//! - [`model`] is the JSON shape of the state file.
//! - [`store`] loads and atomically replaces that file.
//! - [`diff`] compares persisted state with freshly parsed definitions.

pub mod diff;
pub mod model;
pub mod store;

pub use diff::{compute_diff, compute_task_changes, task_has_changes, workflow_has_changes, TaskChangeCounts, WorkflowDiff};
pub use model::{StateFile, TaskState, WorkflowState};
pub use store::StateStore;
