// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::RetryPolicy;

/// Default size of the per-workflow worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 4;
/// Default base interval for retry backoff.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);
/// Upper bound on a single backoff sleep.
pub const DEFAULT_RETRY_MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);
/// Timeout used when a task has none, or an unparseable one.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Well-known location of the state store, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = "tgfs-state.json";

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// max_workers = 4
/// max_parallel_workflows = 0
/// retry_base = "1s"
/// retry_max_backoff = "5m"
/// default_timeout = "30m"
///
/// [state]
/// path = "tgfs-state.json"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub state: StateSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Concurrent tasks per workflow.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Concurrent workflows per apply; `0` means unbounded.
    #[serde(default)]
    pub max_parallel_workflows: usize,

    #[serde(default = "default_retry_base")]
    pub retry_base: String,

    #[serde(default = "default_retry_max_backoff")]
    pub retry_max_backoff: String,

    #[serde(default = "default_timeout")]
    pub default_timeout: String,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_retry_base() -> String {
    "1s".to_string()
}

fn default_retry_max_backoff() -> String {
    "5m".to_string()
}

fn default_timeout() -> String {
    "30m".to_string()
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            max_parallel_workflows: 0,
            retry_base: default_retry_base(),
            retry_max_backoff: default_retry_max_backoff(),
            default_timeout: default_timeout(),
        }
    }
}

/// `[state]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StateSection {
    #[serde(default = "default_state_path")]
    pub path: String,
}

fn default_state_path() -> String {
    DEFAULT_STATE_FILE.to_string()
}

impl Default for StateSection {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

/// Typed engine knobs shared by the scheduler and the apply driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_workers: usize,
    /// `None` means every workflow starts immediately.
    pub max_parallel_workflows: Option<usize>,
    pub retry: RetryPolicy,
    pub default_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            max_parallel_workflows: None,
            retry: RetryPolicy::new(DEFAULT_RETRY_BASE, DEFAULT_RETRY_MAX_BACKOFF),
            default_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub state_path: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(engine: EngineSettings, state_path: PathBuf) -> Self {
        Self { engine, state_path }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
        }
    }
}
