// src/engine/scheduler.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::DependencyGraph;
use crate::errors::{DefinitionError, TaskExecError, WorkflowError};
use crate::exec::TaskExecutor;
use crate::state::{TaskState, WorkflowState};
use crate::types::{TaskStatus, WorkflowStatus};
use crate::workflow::{TaskId, Workflow};

/// What a worker hands back when its task reaches a terminal status.
struct Finished {
    index: usize,
    task: TaskId,
    state: TaskState,
    result: Result<(), TaskExecError>,
}

/// Runs one workflow to a terminal status.
///
/// The scheduler loop is the only owner of the [`DependencyGraph`]: workers
/// are `JoinSet` members, and every completion comes back through
/// `join_next` before the graph is advanced. Each `TaskState` is moved into
/// the worker that runs it and moved back when the worker finishes.
pub struct WorkflowScheduler {
    workflow: Arc<Workflow>,
    state: WorkflowState,
    executor: Arc<TaskExecutor>,
    max_workers: usize,
}

impl fmt::Debug for WorkflowScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowScheduler")
            .field("workflow", &self.workflow.name)
            .field("status", &self.state.status)
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

impl WorkflowScheduler {
    pub fn new(
        workflow: Workflow,
        state: WorkflowState,
        executor: Arc<TaskExecutor>,
        max_workers: usize,
    ) -> Self {
        Self {
            workflow: Arc::new(workflow),
            state,
            executor,
            max_workers: max_workers.max(1),
        }
    }

    pub fn into_state(self) -> WorkflowState {
        self.state
    }

    /// Execute every task, respecting dependencies and the worker bound.
    ///
    /// The first `failed` / `timeout` task cancels the rest of the workflow:
    /// queued tasks stay `pending`, in-flight ones are killed and recorded
    /// `cancelled`. Cancelling `cancel` stops the workflow the same way and
    /// leaves it `cancelled` instead of `failed`.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), WorkflowError> {
        let name = self.workflow.name.clone();
        self.align_task_states();
        self.state.status = WorkflowStatus::Running;

        let mut graph = match DependencyGraph::build(&self.workflow) {
            Ok(graph) => graph,
            Err(err) => {
                error!(workflow = %name, error = %err, "invalid workflow definition");
                self.state.status = WorkflowStatus::Failed;
                return Err(err.into());
            }
        };

        let index: HashMap<TaskId, usize> = self
            .state
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        // Fail-fast cancels this scope only; siblings keep running.
        let scope = cancel.child_token();
        let mut ready: VecDeque<TaskId> = graph.ready_tasks().into();
        let mut workers: JoinSet<Finished> = JoinSet::new();
        let mut in_flight: HashMap<Id, usize> = HashMap::new();
        let mut first_failure: Option<WorkflowError> = None;

        info!(
            workflow = %name,
            tasks = graph.len(),
            ready = ready.len(),
            max_workers = self.max_workers,
            "workflow started"
        );

        loop {
            while workers.len() < self.max_workers && !scope.is_cancelled() {
                let Some(task_id) = ready.pop_front() else {
                    break;
                };
                let Some(&idx) = index.get(&task_id) else {
                    continue;
                };
                let handle = self.dispatch(&mut workers, idx, &task_id, &scope);
                in_flight.insert(handle, idx);
            }

            let Some(joined) = workers.join_next_with_id().await else {
                break;
            };

            let finished = match joined {
                Ok((id, finished)) => {
                    in_flight.remove(&id);
                    finished
                }
                Err(join_err) => {
                    let Some(idx) = in_flight.remove(&join_err.id()) else {
                        error!(workflow = %name, error = %join_err, "unknown worker failed");
                        continue;
                    };
                    self.worker_panicked(idx, &join_err.to_string())
                }
            };

            let status = finished.state.status;
            self.state.tasks[finished.index] = finished.state;

            match finished.result {
                Ok(()) => {
                    let unblocked = graph.mark_completed(&finished.task);
                    if !unblocked.is_empty() {
                        debug!(workflow = %name, task = %finished.task, ?unblocked, "dependents unblocked");
                    }
                    ready.extend(unblocked);
                }
                Err(source) if status.is_failure() => {
                    if first_failure.is_none() {
                        warn!(
                            workflow = %name,
                            task = %finished.task,
                            status = %status,
                            "task failed; cancelling remaining tasks"
                        );
                        first_failure = Some(WorkflowError::TaskFailed {
                            workflow: name.clone(),
                            task: finished.task,
                            source,
                        });
                        scope.cancel();
                    }
                }
                Err(_) => {}
            }
        }

        let result = if let Some(err) = first_failure {
            self.state.status = WorkflowStatus::Failed;
            Err(err)
        } else if graph.completed_count() == graph.len() {
            self.state.status = WorkflowStatus::Completed;
            Ok(())
        } else if cancel.is_cancelled() {
            self.state.status = WorkflowStatus::Cancelled;
            Err(WorkflowError::Cancelled {
                workflow: name.clone(),
            })
        } else {
            self.state.status = WorkflowStatus::Failed;
            Err(DefinitionError::Unschedulable {
                workflow: name.clone(),
                remaining: graph.remaining(),
            }
            .into())
        };

        info!(
            workflow = %name,
            status = %self.state.status,
            completed = graph.completed_count(),
            total = graph.len(),
            "workflow finished"
        );
        result
    }

    fn dispatch(
        &mut self,
        workers: &mut JoinSet<Finished>,
        idx: usize,
        task_id: &str,
        scope: &CancellationToken,
    ) -> Id {
        let workflow = Arc::clone(&self.workflow);
        let executor = Arc::clone(&self.executor);
        let token = scope.clone();
        let task_id = task_id.to_string();
        let mut state = std::mem::take(&mut self.state.tasks[idx]);

        debug!(workflow = %workflow.name, task = %task_id, "dispatching task");

        let handle = workers.spawn(async move {
            let result = match workflow.task(&task_id) {
                Some(task) => executor.execute(&workflow.name, task, &mut state, &token).await,
                None => Err(TaskExecError::Spawn {
                    attempts: 0,
                    message: format!("task '{task_id}' is not defined"),
                }),
            };
            Finished {
                index: idx,
                task: task_id,
                state,
                result,
            }
        });
        handle.id()
    }

    /// Rebuild the state a panicking worker took with it.
    fn worker_panicked(&self, idx: usize, reason: &str) -> Finished {
        let task_id = self
            .workflow
            .tasks
            .get(idx)
            .map(|t| t.id.clone())
            .unwrap_or_default();
        error!(workflow = %self.workflow.name, task = %task_id, reason, "task worker panicked");

        let mut state = self
            .workflow
            .task(&task_id)
            .map(|t| TaskState::from_task(t, self.workflow.effective_dependencies(&t.id)))
            .unwrap_or_default();
        state.status = TaskStatus::Failed;
        state.error = Some(format!("worker panicked: {reason}"));

        Finished {
            index: idx,
            task: task_id,
            state,
            result: Err(TaskExecError::Failed { attempts: 0, code: -1 }),
        }
    }

    /// One `TaskState` per defined task, in definition order.
    fn align_task_states(&mut self) {
        let mut existing: HashMap<String, TaskState> = std::mem::take(&mut self.state.tasks)
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        self.state.tasks = self
            .workflow
            .tasks
            .iter()
            .map(|task| {
                existing.remove(&task.id).unwrap_or_else(|| {
                    TaskState::from_task(task, self.workflow.effective_dependencies(&task.id))
                })
            })
            .collect();
    }
}
