// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] defines the [`CommandRunner`] seam and the production
//!   [`ShellRunner`].
//! - [`task_runner`] spawns one attempt through the platform shell, with
//!   timeout and cancellation.
//! - [`executor`] wraps a runner in the per-task retry loop and records the
//!   outcome in the task's `TaskState`.
//! - [`retry`] computes the backoff between attempts.

pub mod backend;
pub mod executor;
pub mod retry;
pub mod task_runner;

pub use backend::{AttemptOutcome, AttemptRequest, CommandRunner, ShellRunner};
pub use executor::TaskExecutor;
pub use retry::RetryPolicy;
