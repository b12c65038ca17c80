// src/exec/backend.rs

//! Pluggable command runner.
//!
//! [`TaskExecutor`](super::TaskExecutor) owns the retry loop and talks to a
//! [`CommandRunner`] for each individual attempt. Production uses
//! [`ShellRunner`], which spawns real processes; tests swap in a scripted
//! runner that never touches the OS.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::task_runner::run_command;

/// One attempt of one task, as handed to a [`CommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRequest {
    pub workflow: String,
    pub task: String,
    pub command: String,
    /// One-based attempt number.
    pub attempt: u32,
    pub timeout: Duration,
}

/// How a single attempt ended. `output` is stdout and stderr combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { output: String },
    Failed { code: i32, output: String },
    TimedOut { output: String },
    Cancelled { output: String },
}

impl AttemptOutcome {
    pub fn output(&self) -> &str {
        match self {
            AttemptOutcome::Success { output }
            | AttemptOutcome::Failed { output, .. }
            | AttemptOutcome::TimedOut { output }
            | AttemptOutcome::Cancelled { output } => output,
        }
    }
}

/// Runs a single attempt of a task command.
///
/// Implementations must honour both the request timeout and `cancel`,
/// returning `TimedOut` / `Cancelled` instead of running on. An `Err` means
/// the command could not be started at all; the executor counts it as a
/// failed attempt.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        request: AttemptRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<AttemptOutcome>> + Send + '_>>;
}

/// Runs commands through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(
        &self,
        request: AttemptRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<AttemptOutcome>> + Send + '_>> {
        Box::pin(async move { run_command(&request, &cancel).await })
    }
}
