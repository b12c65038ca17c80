use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use taskgraph::exec::{AttemptOutcome, AttemptRequest, CommandRunner};
use tokio_util::sync::CancellationToken;

/// What one attempt of a task does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail(i32),
    /// Runs until the request timeout expires.
    TimeOut,
    /// Runs until cancelled.
    Hang,
    /// The command cannot be started.
    SpawnError,
}

/// Recorded attempt boundaries, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Started { task: String, attempt: u32 },
    Finished { task: String, attempt: u32, outcome: &'static str },
}

#[derive(Debug, Default)]
struct Script {
    /// Behaviours for the first attempts, consumed in order.
    queued: Vec<Behaviour>,
    then: Option<Behaviour>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Inner {
    scripts: HashMap<String, Script>,
    default_delay: Duration,
    events: Vec<RunnerEvent>,
    running: usize,
    peak: usize,
}

/// A fake `CommandRunner` that:
/// - never spawns processes
/// - follows a per-task script (succeed, fail N times, time out, hang)
/// - records start/finish order and peak concurrency.
///
/// Tasks are keyed by task ID; unscripted tasks succeed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long every attempt takes unless a task overrides it.
    pub fn with_default_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().default_delay = delay;
        self
    }

    pub fn with_delay(self, task: &str, delay: Duration) -> Self {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .entry(task.to_string())
            .or_default()
            .delay = Some(delay);
        self
    }

    /// First `times` attempts exit with code 1, later ones succeed.
    pub fn fail_times(self, task: &str, times: usize) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let script = inner.scripts.entry(task.to_string()).or_default();
            script.queued = vec![Behaviour::Fail(1); times];
            script.then = Some(Behaviour::Succeed);
        }
        self
    }

    /// Every attempt behaves like `behaviour`.
    pub fn always(self, task: &str, behaviour: Behaviour) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let script = inner.scripts.entry(task.to_string()).or_default();
            script.queued.clear();
            script.then = Some(behaviour);
        }
        self
    }

    pub fn events(&self) -> Vec<RunnerEvent> {
        self.inner.lock().unwrap().events.clone()
    }

    /// Task IDs in the order their first attempt started.
    pub fn started_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for event in self.events() {
            if let RunnerEvent::Started { task, .. } = event {
                if !order.contains(&task) {
                    order.push(task);
                }
            }
        }
        order
    }

    pub fn attempts(&self, task: &str) -> u32 {
        self.events()
            .iter()
            .filter(|e| matches!(e, RunnerEvent::Started { task: t, .. } if t == task))
            .count() as u32
    }

    pub fn was_started(&self, task: &str) -> bool {
        self.attempts(task) > 0
    }

    pub fn peak_concurrency(&self) -> usize {
        self.inner.lock().unwrap().peak
    }

    /// Index of the event matching `pred`, for ordering assertions.
    pub fn position(&self, pred: impl Fn(&RunnerEvent) -> bool) -> Option<usize> {
        self.events().iter().position(pred)
    }
}

fn label(outcome: &anyhow::Result<AttemptOutcome>) -> &'static str {
    match outcome {
        Ok(AttemptOutcome::Success { .. }) => "success",
        Ok(AttemptOutcome::Failed { .. }) => "failed",
        Ok(AttemptOutcome::TimedOut { .. }) => "timeout",
        Ok(AttemptOutcome::Cancelled { .. }) => "cancelled",
        Err(_) => "spawn-error",
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        request: AttemptRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AttemptOutcome>> + Send + '_>> {
        let inner = Arc::clone(&self.inner);

        Box::pin(async move {
            let (behaviour, delay) = {
                let mut guard = inner.lock().unwrap();
                guard.running += 1;
                guard.peak = guard.peak.max(guard.running);
                guard.events.push(RunnerEvent::Started {
                    task: request.task.clone(),
                    attempt: request.attempt,
                });

                let default_delay = guard.default_delay;
                match guard.scripts.get_mut(&request.task) {
                    Some(script) => {
                        let behaviour = if script.queued.is_empty() {
                            script.then.unwrap_or(Behaviour::Succeed)
                        } else {
                            script.queued.remove(0)
                        };
                        (behaviour, script.delay.unwrap_or(default_delay))
                    }
                    None => (Behaviour::Succeed, default_delay),
                }
            };

            let output = format!("{} attempt {}\n", request.task, request.attempt);
            let outcome = match behaviour {
                Behaviour::Succeed | Behaviour::Fail(_) => tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(match behaviour {
                        Behaviour::Fail(code) => AttemptOutcome::Failed { code, output },
                        _ => AttemptOutcome::Success { output },
                    }),
                    _ = cancel.cancelled() => Ok(AttemptOutcome::Cancelled { output }),
                },
                Behaviour::TimeOut => tokio::select! {
                    _ = tokio::time::sleep(request.timeout) => Ok(AttemptOutcome::TimedOut { output }),
                    _ = cancel.cancelled() => Ok(AttemptOutcome::Cancelled { output }),
                },
                Behaviour::Hang => {
                    cancel.cancelled().await;
                    Ok(AttemptOutcome::Cancelled { output })
                }
                Behaviour::SpawnError => Err(anyhow!("scripted spawn failure")),
            };

            {
                let mut guard = inner.lock().unwrap();
                guard.running -= 1;
                guard.events.push(RunnerEvent::Finished {
                    task: request.task.clone(),
                    attempt: request.attempt,
                    outcome: label(&outcome),
                });
            }
            outcome
        })
    }
}
