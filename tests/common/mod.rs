#![allow(dead_code)]

use std::fs;
use std::path::Path;

pub use taskgraph_test_utils::{executor_with, init_tracing, with_timeout};

/// Markdown body for a task file.
pub fn task_markdown(command: &str, deps: &[&str], retries: u32, timeout: &str) -> String {
    let deps = if deps.is_empty() {
        "None".to_string()
    } else {
        deps.join(", ")
    };
    format!(
        "# Task\n\n## Command\n{command}\n\n## Dependencies\n{deps}\n\n## Priority\nmedium\n\n## Retries\n{retries}\n\n## Timeout\n{timeout}\n"
    )
}

/// Write `<dir>/<id>.md` on the real filesystem.
pub fn write_task(dir: &Path, id: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(format!("{id}.md")), body).unwrap();
}
