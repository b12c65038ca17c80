// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, EngineSettings, RawConfigFile};
use crate::errors::{Result, TaskgraphError};
use crate::exec::RetryPolicy;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let engine = validate_engine(&raw)?;
        let state_path = validate_state_path(&raw)?;
        Ok(ConfigFile::new_unchecked(engine, state_path))
    }
}

fn validate_engine(cfg: &RawConfigFile) -> Result<EngineSettings> {
    let engine = &cfg.engine;

    if engine.max_workers == 0 {
        return Err(TaskgraphError::ConfigError(
            "[engine].max_workers must be >= 1 (got 0)".to_string(),
        ));
    }

    let retry_base = config_duration("retry_base", &engine.retry_base)?;
    let retry_max_backoff = config_duration("retry_max_backoff", &engine.retry_max_backoff)?;
    if retry_max_backoff < retry_base {
        return Err(TaskgraphError::ConfigError(format!(
            "[engine].retry_max_backoff ({}) must not be shorter than retry_base ({})",
            engine.retry_max_backoff, engine.retry_base
        )));
    }

    let default_timeout = config_duration("default_timeout", &engine.default_timeout)?;
    if default_timeout.is_zero() {
        return Err(TaskgraphError::ConfigError(
            "[engine].default_timeout must be greater than zero".to_string(),
        ));
    }

    Ok(EngineSettings {
        max_workers: engine.max_workers,
        max_parallel_workflows: match engine.max_parallel_workflows {
            0 => None,
            n => Some(n),
        },
        retry: RetryPolicy::new(retry_base, retry_max_backoff),
        default_timeout,
    })
}

fn validate_state_path(cfg: &RawConfigFile) -> Result<PathBuf> {
    let path = cfg.state.path.trim();
    if path.is_empty() {
        return Err(TaskgraphError::ConfigError(
            "[state].path must not be empty".to_string(),
        ));
    }
    Ok(PathBuf::from(path))
}

fn config_duration(key: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| TaskgraphError::ConfigError(format!("[engine].{key}: {e}")))
}
