// src/engine/apply.rs

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::EngineSettings;
use crate::errors::{StoreError, TaskgraphError, WorkflowError};
use crate::exec::TaskExecutor;
use crate::state::{StateFile, StateStore, WorkflowState};
use crate::types::WorkflowStatus;
use crate::workflow::Workflow;

use super::plan::Plan;
use super::scheduler::WorkflowScheduler;

/// Outcome of running a set of workflows.
#[derive(Debug)]
pub struct ApplyReport {
    /// One entry per workflow, in definition order.
    pub state: StateFile,
    /// Every workflow that did not complete, in definition order.
    pub errors: Vec<WorkflowError>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| !e.is_cancelled())
            .map(|e| e.workflow().to_string())
            .collect()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| e.is_cancelled())
            .map(|e| e.workflow().to_string())
            .collect()
    }

    /// `ApplyFailed` listing the workflows that did not complete.
    pub fn into_result(self) -> crate::errors::Result<StateFile> {
        if self.is_success() {
            return Ok(self.state);
        }
        Err(TaskgraphError::ApplyFailed {
            failed: self.failed(),
            cancelled: self.cancelled(),
        })
    }
}

/// Run every workflow concurrently, one scheduler each.
///
/// A failing workflow never stops its siblings. With
/// `max_parallel_workflows` set, schedulers wait for a permit before
/// starting; a cancelled waiter gives up and records its workflow
/// `cancelled`.
pub async fn run_workflows(
    workflows: Vec<Workflow>,
    executor: Arc<TaskExecutor>,
    settings: &EngineSettings,
    cancel: &CancellationToken,
) -> ApplyReport {
    let limiter = settings
        .max_parallel_workflows
        .filter(|n| *n > 0)
        .map(|n| Arc::new(Semaphore::new(n)));

    let mut slots: Vec<Option<(WorkflowState, Option<WorkflowError>)>> = Vec::new();
    let mut initial: Vec<WorkflowState> = Vec::new();
    let mut positions = HashMap::new();
    let mut set = JoinSet::new();

    for (position, workflow) in workflows.into_iter().enumerate() {
        let state = WorkflowState::from_workflow(&workflow);
        initial.push(state.clone());
        slots.push(None);

        let mut scheduler =
            WorkflowScheduler::new(workflow, state, Arc::clone(&executor), settings.max_workers);
        let token = cancel.child_token();
        let limiter = limiter.clone();

        let handle = set.spawn(async move {
            let _permit = match limiter {
                Some(semaphore) => tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok(),
                    _ = token.cancelled() => None,
                },
                None => None,
            };
            let result = scheduler.run(&token).await;
            (position, scheduler.into_state(), result.err())
        });
        positions.insert(handle.id(), position);
    }

    info!(workflows = slots.len(), "apply started");

    while let Some(joined) = set.join_next_with_id().await {
        match joined {
            Ok((_, (position, state, err))) => {
                if let Some(slot) = slots.get_mut(position) {
                    *slot = Some((state, err));
                }
            }
            Err(join_err) => {
                let Some(&position) = positions.get(&join_err.id()) else {
                    error!(error = %join_err, "unknown workflow task failed");
                    continue;
                };
                let mut state = initial[position].clone();
                state.status = WorkflowStatus::Failed;
                error!(workflow = %state.workflow_id, error = %join_err, "workflow scheduler panicked");
                let err = WorkflowError::Aborted {
                    workflow: state.workflow_id.clone(),
                    reason: join_err.to_string(),
                };
                slots[position] = Some((state, Some(err)));
            }
        }
    }

    let mut report = ApplyReport {
        state: StateFile::default(),
        errors: Vec::new(),
    };
    for (slot, fallback) in slots.into_iter().zip(initial) {
        let (state, err) = slot.unwrap_or((fallback, None));
        if let Some(err) = err {
            warn!(workflow = %state.workflow_id, status = %state.status, error = %err, "workflow did not complete");
            report.errors.push(err);
        }
        report.state.workflows.push(state);
    }

    info!(
        workflows = report.state.workflows.len(),
        failed = report.failed().len(),
        cancelled = report.cancelled().len(),
        "apply finished"
    );
    report
}

/// Plan and apply against one state store.
#[derive(Debug, Clone)]
pub struct ApplyDriver {
    store: StateStore,
    executor: Arc<TaskExecutor>,
    settings: EngineSettings,
}

impl ApplyDriver {
    pub fn new(store: StateStore, executor: Arc<TaskExecutor>, settings: EngineSettings) -> Self {
        Self {
            store,
            executor,
            settings,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Load the persisted state and diff it against `workflows`.
    pub fn plan(&self, workflows: &[Workflow]) -> Result<(StateFile, Plan), StoreError> {
        let current = self.store.load()?;
        let plan = Plan::compute(&current, workflows);
        Ok((current, plan))
    }

    /// Run `workflows` and persist the resulting snapshot, whether or not
    /// every workflow completed.
    pub async fn apply(
        &self,
        workflows: Vec<Workflow>,
        cancel: &CancellationToken,
    ) -> Result<ApplyReport, StoreError> {
        let report = run_workflows(workflows, Arc::clone(&self.executor), &self.settings, cancel).await;
        self.store.save(&report.state)?;
        Ok(report)
    }
}
