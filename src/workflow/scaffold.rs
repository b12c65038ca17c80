// src/workflow/scaffold.rs

//! `taskgraph init`: create a workflow directory with an example task.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::info;

use crate::fs::FileSystem;

static INVALID_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("name regex is valid"));

pub const EXAMPLE_TASK_FILE: &str = "task.example.md";

const TASK_TEMPLATE: &str = "# Example task

## Command
echo \"hello from {workflow}\"

## Dependencies
None

## Priority
medium

## Retries
1

## Timeout
30m
";

/// Lowercase, spaces to `-`, anything outside `[a-z0-9-]` dropped.
pub fn sanitize_workflow_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace(' ', "-");
    INVALID_NAME_CHARS.replace_all(&lowered, "").into_owned()
}

/// Create `<base>/<sanitized name>/task.example.md` and return the workflow
/// directory. Refuses to overwrite an existing example task.
pub fn create_workflow(fs: &dyn FileSystem, base: &Path, name: &str) -> Result<PathBuf> {
    let sanitized = sanitize_workflow_name(name);
    if sanitized.is_empty() {
        bail!("workflow name '{name}' is empty after sanitizing");
    }

    let dir = base.join(&sanitized);
    let task_path = dir.join(EXAMPLE_TASK_FILE);
    if fs.exists(&task_path) {
        bail!("{:?} already exists", task_path);
    }

    fs.create_dir_all(&dir)
        .with_context(|| format!("creating workflow directory {:?}", dir))?;
    fs.write(&task_path, TASK_TEMPLATE.replace("{workflow}", &sanitized).as_bytes())
        .with_context(|| format!("writing {:?}", task_path))?;

    info!(workflow = %sanitized, dir = ?dir, "initialized workflow");
    Ok(dir)
}
