// src/workflow/extractor.rs

//! Task property extraction.
//!
//! The parser hands every task file to a [`TaskPropertyExtractor`] and gets
//! back the command, dependencies, priority, retry budget and timeout. The
//! built-in [`MarkdownExtractor`] reads these from `## <Section>` headings:
//!
//! ```markdown
//! # Build
//!
//! ## Command
//! cargo build --release
//!
//! ## Dependencies
//! fetch, generate
//!
//! ## Priority
//! high
//!
//! ## Retries
//! 2
//!
//! ## Timeout
//! 10m
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use anyhow::{anyhow, Context, Result};
use regex::Regex;

use crate::fs::FileSystem;

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#{2,}\s+(.+?)\s*#*\s*$").expect("heading regex is valid")
});

/// Properties of one task as reported by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskProps {
    pub command: String,
    pub dependencies: Vec<String>,
    pub priority: String,
    pub retries: u32,
    pub timeout: String,
}

/// Turns a task source file into [`TaskProps`].
///
/// An error aborts parsing of the whole definition tree.
pub trait TaskPropertyExtractor: Send + Sync + Debug {
    fn extract(&self, path: &Path) -> Result<TaskProps>;
}

/// Reads task properties from markdown section headings.
#[derive(Debug, Clone)]
pub struct MarkdownExtractor {
    fs: Arc<dyn FileSystem>,
}

impl MarkdownExtractor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Parse the markdown body of a task file.
    pub fn parse_markdown(contents: &str) -> Result<TaskProps> {
        let sections = split_sections(contents);

        let command = sections
            .get("command")
            .map(|lines| {
                lines
                    .iter()
                    .filter(|l| !l.trim_start().starts_with("```"))
                    .map(|l| l.trim_end())
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string()
            })
            .filter(|c| !c.is_empty())
            .ok_or_else(|| anyhow!("missing or empty '## Command' section"))?;

        let dependencies = sections
            .get("dependencies")
            .map(|lines| parse_dependency_list(lines))
            .unwrap_or_default();

        let priority = first_value(&sections, "priority").unwrap_or_default();

        let retries = match first_value(&sections, "retries") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("invalid '## Retries' value '{raw}'"))?,
            None => 0,
        };

        let timeout = first_value(&sections, "timeout").unwrap_or_default();

        Ok(TaskProps {
            command,
            dependencies,
            priority,
            retries,
            timeout,
        })
    }
}

impl TaskPropertyExtractor for MarkdownExtractor {
    fn extract(&self, path: &Path) -> Result<TaskProps> {
        let contents = self.fs.read_to_string(path)?;
        Self::parse_markdown(&contents).with_context(|| format!("extracting task properties from {:?}", path))
    }
}

/// Group body lines under their lowercased `##` heading.
fn split_sections(contents: &str) -> HashMap<String, Vec<String>> {
    let mut sections: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in contents.lines() {
        if let Some(caps) = HEADING.captures(line) {
            let name = caps[1].trim().to_lowercase();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        if let Some(name) = &current {
            if let Some(lines) = sections.get_mut(name) {
                lines.push(line.to_string());
            }
        }
    }

    sections
}

fn first_value(sections: &HashMap<String, Vec<String>>, key: &str) -> Option<String> {
    sections
        .get(key)?
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .map(|l| l.to_string())
}

/// `None`, blank, or a comma/newline separated list with optional bullets.
fn parse_dependency_list(lines: &[String]) -> Vec<String> {
    let mut deps = Vec::new();

    for line in lines {
        for item in line.split(',') {
            let item = item
                .trim()
                .trim_start_matches(['-', '*'])
                .trim();
            let item = item.strip_suffix(".md").unwrap_or(item);
            if item.is_empty() || item.eq_ignore_ascii_case("none") {
                continue;
            }
            if !deps.iter().any(|d| d == item) {
                deps.push(item.to_string());
            }
        }
    }

    deps
}
