// src/exec/executor.rs

//! Retry loop around a [`CommandRunner`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{format_duration, parse_duration};
use crate::errors::TaskExecError;
use crate::state::TaskState;
use crate::types::TaskStatus;
use crate::workflow::Task;

use super::backend::{AttemptOutcome, AttemptRequest, CommandRunner};
use super::retry::RetryPolicy;

/// Executes one task to a terminal status, retrying failed attempts.
///
/// Shared by every worker of every workflow; all per-task state lives in the
/// `TaskState` handed to [`TaskExecutor::execute`].
#[derive(Clone)]
pub struct TaskExecutor {
    runner: Arc<dyn CommandRunner>,
    retry: RetryPolicy,
    default_timeout: Duration,
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("retry", &self.retry)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl TaskExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>, retry: RetryPolicy, default_timeout: Duration) -> Self {
        Self {
            runner,
            retry,
            default_timeout,
        }
    }

    /// The task's own timeout, or the default when it is empty, zero or
    /// does not parse.
    pub fn resolve_timeout(&self, task: &Task) -> Duration {
        let raw = task.timeout.trim();
        if raw.is_empty() {
            return self.default_timeout;
        }
        match parse_duration(raw) {
            Ok(timeout) if !timeout.is_zero() => timeout,
            Ok(_) => {
                warn!(task = %task.id, timeout = raw, "zero task timeout, using default");
                self.default_timeout
            }
            Err(e) => {
                warn!(
                    task = %task.id,
                    timeout = raw,
                    error = %e,
                    default = %format_duration(self.default_timeout),
                    "invalid task timeout, using default"
                );
                self.default_timeout
            }
        }
    }

    /// Run `task` until it completes, exhausts `retries + 1` attempts, or
    /// `cancel` fires.
    ///
    /// `state` is updated in place and always ends in a terminal status:
    /// `Ok(())` means `Completed`; the error says whether the task failed,
    /// timed out or was cancelled.
    pub async fn execute(
        &self,
        workflow: &str,
        task: &Task,
        state: &mut TaskState,
        cancel: &CancellationToken,
    ) -> Result<(), TaskExecError> {
        let timeout = self.resolve_timeout(task);
        let max_attempts = task.retries.saturating_add(1);
        let started = Instant::now();
        let mut last_error: Option<TaskExecError> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                state.status = TaskStatus::Retrying;
                let delay = self.retry.backoff(attempt);
                debug!(
                    workflow,
                    task = %task.id,
                    attempt = attempt + 1,
                    delay = %format_duration(delay),
                    "backing off before retry"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {
                        return Err(self.cancelled(workflow, task, state, started));
                    }
                }
            }

            if cancel.is_cancelled() {
                return Err(self.cancelled(workflow, task, state, started));
            }

            state.status = TaskStatus::Running;
            state.attempts += 1;

            let request = AttemptRequest {
                workflow: workflow.to_string(),
                task: task.id.clone(),
                command: task.command.clone(),
                attempt: state.attempts,
                timeout,
            };

            let error = match self.runner.run(request, cancel.clone()).await {
                Ok(AttemptOutcome::Success { output }) => {
                    state.status = TaskStatus::Completed;
                    state.output = non_empty(output);
                    state.error = None;
                    state.duration = Some(format_duration(started.elapsed()));
                    info!(
                        workflow,
                        task = %task.id,
                        attempts = state.attempts,
                        status = %state.status,
                        "task completed"
                    );
                    return Ok(());
                }
                Ok(AttemptOutcome::Failed { code, output }) => {
                    state.output = non_empty(output);
                    TaskExecError::Failed {
                        attempts: state.attempts,
                        code,
                    }
                }
                Ok(AttemptOutcome::TimedOut { output }) => {
                    state.output = non_empty(output);
                    TaskExecError::TimedOut {
                        attempts: state.attempts,
                        timeout,
                    }
                }
                Ok(AttemptOutcome::Cancelled { output }) => {
                    state.output = non_empty(output);
                    return Err(self.cancelled(workflow, task, state, started));
                }
                Err(e) => TaskExecError::Spawn {
                    attempts: state.attempts,
                    message: format!("{e:#}"),
                },
            };

            warn!(
                workflow,
                task = %task.id,
                attempt = state.attempts,
                max_attempts,
                error = %error,
                "task attempt failed"
            );
            state.error = Some(error.to_string());
            last_error = Some(error);
        }

        let error = last_error.unwrap_or(TaskExecError::Failed {
            attempts: state.attempts,
            code: -1,
        });
        state.status = match error {
            TaskExecError::TimedOut { .. } => TaskStatus::Timeout,
            _ => TaskStatus::Failed,
        };
        state.duration = Some(format_duration(started.elapsed()));
        warn!(
            workflow,
            task = %task.id,
            attempts = state.attempts,
            status = %state.status,
            "task gave up"
        );
        Err(error)
    }

    fn cancelled(
        &self,
        workflow: &str,
        task: &Task,
        state: &mut TaskState,
        started: Instant,
    ) -> TaskExecError {
        let error = TaskExecError::Cancelled {
            attempts: state.attempts,
        };
        state.status = TaskStatus::Cancelled;
        state.error = Some(error.to_string());
        state.duration = Some(format_duration(started.elapsed()));
        info!(workflow, task = %task.id, attempts = state.attempts, "task cancelled");
        error
    }
}

fn non_empty(output: String) -> Option<String> {
    if output.trim().is_empty() {
        None
    } else {
        Some(output)
    }
}
