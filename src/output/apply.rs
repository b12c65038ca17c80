// src/output/apply.rs

use std::fmt::Write;

use crate::engine::ApplyReport;
use crate::types::{TaskStatus, WorkflowStatus};

/// One line per workflow plus its unfinished tasks, then a verdict.
pub fn render_apply_summary(report: &ApplyReport) -> String {
    let mut out = String::new();
    out.push_str("\nApply results:\n");

    for workflow in &report.state.workflows {
        let symbol = match workflow.status {
            WorkflowStatus::Completed => '+',
            WorkflowStatus::Cancelled => '!',
            _ => 'x',
        };
        let done = workflow
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        let _ = writeln!(
            out,
            "  {symbol} {}: {} ({done}/{} tasks completed)",
            workflow.workflow_id,
            workflow.status,
            workflow.tasks.len()
        );

        for task in workflow.tasks.iter().filter(|t| t.status != TaskStatus::Completed) {
            match &task.error {
                Some(error) => {
                    let _ = writeln!(out, "      {}: {} ({error})", task.id, task.status);
                }
                None => {
                    let _ = writeln!(out, "      {}: {}", task.id, task.status);
                }
            }
        }
    }

    if report.is_success() {
        out.push_str("\nApply complete!\n");
    } else {
        let _ = writeln!(
            out,
            "\nApply finished with {} failed and {} cancelled workflow(s).",
            report.failed().len(),
            report.cancelled().len()
        );
    }
    out
}
