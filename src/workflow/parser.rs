// src/workflow/parser.rs

//! Directory tree -> [`Workflow`] definitions.
//!
//! Every directory below the base path that directly contains a `*.md` file
//! is a workflow named after its path relative to the base. Each `<id>.md`
//! file in it is a task, and each symlink named `<id>_dependencies[...]`
//! whose target is `<dep>.md` makes `<id>` depend on `<dep>`.

use std::path::{Component, Path};
use std::sync::Arc;

use tracing::debug;

use crate::errors::ParseError;
use crate::fs::FileSystem;
use crate::workflow::extractor::TaskPropertyExtractor;
use crate::workflow::model::{Task, Workflow};

/// Directory names that never hold workflows.
const SKIPPED_DIRS: &[&str] = &["cmd", "internal", "bin", "dist", "vendor", "target"];

const DEPENDENCY_LINK_MARKER: &str = "_dependencies";
const TASK_EXTENSION: &str = ".md";

#[derive(Debug, Clone)]
pub struct WorkflowParser {
    fs: Arc<dyn FileSystem>,
    extractor: Arc<dyn TaskPropertyExtractor>,
}

impl WorkflowParser {
    pub fn new(fs: Arc<dyn FileSystem>, extractor: Arc<dyn TaskPropertyExtractor>) -> Self {
        Self { fs, extractor }
    }

    /// Walk `base` depth-first in name order and parse every workflow found.
    ///
    /// The base directory itself is never a workflow.
    pub fn parse_workflows(&self, base: &Path) -> Result<Vec<Workflow>, ParseError> {
        let mut workflows = Vec::new();
        self.walk(base, base, &mut workflows)?;
        debug!(base = ?base, count = workflows.len(), "parsed workflow definitions");
        Ok(workflows)
    }

    fn walk(&self, base: &Path, dir: &Path, out: &mut Vec<Workflow>) -> Result<(), ParseError> {
        let entries = self.fs.read_dir(dir).map_err(|cause| ParseError::Walk {
            path: dir.to_path_buf(),
            cause,
        })?;

        for entry in entries {
            if self.fs.is_symlink(&entry) || !self.fs.is_dir(&entry) {
                continue;
            }
            if is_skipped_dir(&entry) {
                debug!(dir = ?entry, "skipping directory");
                continue;
            }

            if self.contains_tasks(&entry) {
                let name = workflow_name(base, &entry);
                out.push(self.parse_workflow(&name, &entry)?);
            }
            self.walk(base, &entry, out)?;
        }

        Ok(())
    }

    /// Parse a single workflow directory.
    pub fn parse_workflow(&self, name: &str, dir: &Path) -> Result<Workflow, ParseError> {
        let mut workflow = Workflow::new(name);

        let entries = self.fs.read_dir(dir).map_err(|cause| ParseError::Walk {
            path: dir.to_path_buf(),
            cause,
        })?;

        for entry in entries {
            let Some(file_name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if self.fs.is_symlink(&entry) {
                if let Some((task, dependency)) = self.dependency_link(&entry, file_name)? {
                    let deps = workflow.dependencies.entry(task).or_default();
                    if !deps.contains(&dependency) {
                        deps.push(dependency);
                    }
                }
                continue;
            }

            let Some(id) = file_name.strip_suffix(TASK_EXTENSION) else {
                continue;
            };
            if !self.fs.is_file(&entry) {
                continue;
            }

            let props = self
                .extractor
                .extract(&entry)
                .map_err(|cause| ParseError::Task {
                    path: entry.clone(),
                    cause,
                })?;

            workflow.tasks.push(Task {
                id: id.to_string(),
                source: Some(entry.clone()),
                command: props.command,
                dependencies: props.dependencies,
                priority: props.priority,
                retries: props.retries,
                timeout: props.timeout,
            });
        }

        debug!(
            workflow = %workflow.name,
            tasks = workflow.tasks.len(),
            links = workflow.dependencies.values().map(Vec::len).sum::<usize>(),
            "parsed workflow"
        );
        Ok(workflow)
    }

    fn contains_tasks(&self, dir: &Path) -> bool {
        self.fs
            .read_dir(dir)
            .map(|entries| {
                entries.iter().any(|e| {
                    !self.fs.is_symlink(e)
                        && self.fs.is_file(e)
                        && e.to_str().is_some_and(|s| s.ends_with(TASK_EXTENSION))
                })
            })
            .unwrap_or(false)
    }

    /// `(task, dependency)` for a `<task>_dependencies...` link, `None` for
    /// any other symlink.
    fn dependency_link(
        &self,
        path: &Path,
        file_name: &str,
    ) -> Result<Option<(String, String)>, ParseError> {
        let Some(idx) = file_name.find(DEPENDENCY_LINK_MARKER) else {
            return Ok(None);
        };
        let task = &file_name[..idx];
        if task.is_empty() {
            return Ok(None);
        }

        let target = self.fs.read_link(path).map_err(|cause| ParseError::Link {
            path: path.to_path_buf(),
            cause,
        })?;
        let Some(target_name) = target.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        let dependency = target_name
            .strip_suffix(TASK_EXTENSION)
            .unwrap_or(target_name);

        Ok(Some((task.to_string(), dependency.to_string())))
    }
}

fn is_skipped_dir(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.starts_with('.') || SKIPPED_DIRS.contains(&name),
        None => true,
    }
}

/// `base/a/b` -> `"a/b"` on every platform.
fn workflow_name(base: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(base).unwrap_or(dir);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
