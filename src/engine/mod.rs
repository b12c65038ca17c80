// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`scheduler`] runs one workflow: a bounded pool of task workers fed
//!   from the dependency graph, with fail-fast cancellation.
//! - [`apply`] runs one scheduler per workflow concurrently and persists
//!   the resulting state.
//! - [`plan`] is the read-only diff that precedes an apply.

pub mod apply;
pub mod plan;
pub mod scheduler;

pub use apply::{run_workflows, ApplyDriver, ApplyReport};
pub use plan::Plan;
pub use scheduler::WorkflowScheduler;
