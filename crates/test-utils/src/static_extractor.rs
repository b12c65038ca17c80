use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use taskgraph::workflow::{TaskPropertyExtractor, TaskProps};

/// Extractor that never reads the file: properties come from a map keyed
/// by file stem, defaulting to `command = "true"`.
///
/// Records every path it was asked about.
#[derive(Debug, Clone, Default)]
pub struct StaticExtractor {
    props: HashMap<String, TaskProps>,
    failing: Vec<String>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StaticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_props(mut self, stem: &str, props: TaskProps) -> Self {
        self.props.insert(stem.to_string(), props);
        self
    }

    /// Make extraction of `stem` fail.
    pub fn failing_on(mut self, stem: &str) -> Self {
        self.failing.push(stem.to_string());
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl TaskPropertyExtractor for StaticExtractor {
    fn extract(&self, path: &Path) -> Result<TaskProps> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("bad task path {:?}", path))?
            .to_string();
        self.seen.lock().unwrap().push(stem.clone());

        if self.failing.contains(&stem) {
            return Err(anyhow!("scripted extraction failure for '{stem}'"));
        }

        Ok(self.props.get(&stem).cloned().unwrap_or_else(|| TaskProps {
            command: "true".to_string(),
            ..TaskProps::default()
        }))
    }
}
