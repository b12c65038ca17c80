// src/output/plan.rs

use std::fmt::Write;

use crate::engine::Plan;
use crate::state::{task_has_changes, StateFile, TaskState, WorkflowState};
use crate::workflow::{Task, Workflow};

/// Render `plan` the way `taskgraph plan` prints it.
///
/// `workflows` are the parsed definitions and `current` the persisted state
/// the plan was computed from.
pub fn render_plan(plan: &Plan, workflows: &[Workflow], current: &StateFile) -> String {
    let mut out = String::new();

    out.push_str("Taskgraph Plan:\n\n");
    out.push_str("Workflow actions are indicated with the following symbols:\n");
    out.push_str("  + add (new workflow/task)\n");
    out.push_str("  ~ update (modified workflow/task)\n");
    out.push_str("  - remove (deleted workflow/task)\n\n");

    if plan.has_changes() {
        out.push_str("The following statefile changes will be made:\n\n");
    } else {
        out.push_str("No changes. The statefile matches the workflow definitions.\n");
    }

    for name in &plan.workflows.added {
        if let Some(workflow) = find_workflow(workflows, name) {
            render_addition(&mut out, workflow);
        }
    }
    for name in &plan.workflows.updated {
        if let (Some(workflow), Some(state)) = (find_workflow(workflows, name), current.workflow(name)) {
            render_update(&mut out, workflow, state);
        }
    }
    for name in &plan.workflows.removed {
        if let Some(state) = current.workflow(name) {
            render_removal(&mut out, state);
        }
    }

    let _ = writeln!(out, "\nPlan Summary:");
    let _ = writeln!(
        out,
        "- Workflows: {} to add, {} to update, {} to remove.",
        plan.workflows.added.len(),
        plan.workflows.updated.len(),
        plan.workflows.removed.len()
    );
    let _ = writeln!(
        out,
        "- Tasks: {} to add, {} to update, {} to remove.",
        plan.tasks.added, plan.tasks.updated, plan.tasks.removed
    );
    if plan.has_changes() {
        out.push_str("\nRun `taskgraph apply` to execute these changes.\n");
    }

    out
}

fn render_addition(out: &mut String, workflow: &Workflow) {
    let _ = writeln!(out, "  + \"workflows[{}]\" {{", workflow.name);
    let _ = writeln!(out, "      \"workflow_id\": {},", quote(&workflow.name));
    let _ = writeln!(out, "      \"status\": \"pending\",");
    let _ = writeln!(out, "      \"tasks\": [");
    for (i, task) in workflow.tasks.iter().enumerate() {
        let deps = workflow.effective_dependencies(&task.id);
        render_task_addition(out, task, &deps, "        ");
        out.push_str(if i + 1 < workflow.tasks.len() { ",\n" } else { "\n" });
    }
    let _ = writeln!(out, "      ]");
    let _ = writeln!(out, "    }}\n");
}

fn render_update(out: &mut String, workflow: &Workflow, state: &WorkflowState) {
    let _ = writeln!(out, "  ~ \"workflows[{}]\" {{", workflow.name);
    let _ = writeln!(out, "      \"workflow_id\": {},", quote(&workflow.name));
    let _ = writeln!(out, "      \"tasks\": [");

    let mut blocks: Vec<String> = Vec::new();
    for task in &workflow.tasks {
        let deps = workflow.effective_dependencies(&task.id);
        let mut block = String::new();
        match state.task(&task.id) {
            None => render_task_addition(&mut block, task, &deps, "        "),
            Some(current) if task_has_changes(task, &deps, current) => {
                render_task_update(&mut block, task, &deps, current)
            }
            Some(_) => continue,
        }
        blocks.push(block);
    }
    for current in state.tasks.iter().filter(|t| workflow.task(&t.id).is_none()) {
        let mut block = String::new();
        let _ = writeln!(block, "        - \"tasks[{}]\" {{", current.id);
        let _ = writeln!(block, "            \"id\": {},", quote(&current.id));
        let _ = writeln!(block, "            \"status\": {}", quote(current.status.as_str()));
        block.push_str("          }");
        blocks.push(block);
    }

    if !blocks.is_empty() {
        out.push_str(&blocks.join(",\n"));
        out.push('\n');
    }
    let _ = writeln!(out, "      ]");
    let _ = writeln!(out, "    }}\n");
}

fn render_removal(out: &mut String, state: &WorkflowState) {
    let _ = writeln!(out, "  - \"workflows[{}]\" {{", state.workflow_id);
    let _ = writeln!(out, "      \"workflow_id\": {},", quote(&state.workflow_id));
    let _ = writeln!(out, "      \"status\": {},", quote(state.status.as_str()));
    let _ = writeln!(out, "      \"tasks\": []");
    let _ = writeln!(out, "    }}\n");
}

fn render_task_addition(out: &mut String, task: &Task, deps: &[String], indent: &str) {
    let _ = writeln!(out, "{indent}+ \"tasks[{}]\" {{", task.id);
    let _ = writeln!(out, "{indent}    \"id\": {},", quote(&task.id));
    let _ = writeln!(out, "{indent}    \"command\": {},", quote(&task.command));
    let _ = writeln!(out, "{indent}    \"dependencies\": [{}],", format_list(deps));
    let _ = writeln!(out, "{indent}    \"priority\": {},", quote(&task.priority));
    let _ = writeln!(out, "{indent}    \"retries\": {},", task.retries);
    let _ = writeln!(out, "{indent}    \"status\": \"pending\"");
    let _ = write!(out, "{indent}  }}");
}

fn render_task_update(out: &mut String, task: &Task, deps: &[String], current: &TaskState) {
    let _ = writeln!(out, "        ~ \"tasks[{}]\" {{", task.id);
    let _ = writeln!(out, "            \"id\": {},", quote(&task.id));
    if task.command != current.command {
        let _ = writeln!(
            out,
            "            \"command\": {} -> {},",
            quote(&current.command),
            quote(&task.command)
        );
    }
    let mut old_deps = current.dependencies.clone();
    old_deps.sort();
    if old_deps.as_slice() != deps {
        let _ = writeln!(
            out,
            "            \"dependencies\": [{}] -> [{}],",
            format_list(&old_deps),
            format_list(deps)
        );
    }
    if task.priority != current.priority {
        let _ = writeln!(
            out,
            "            \"priority\": {} -> {},",
            quote(&current.priority),
            quote(&task.priority)
        );
    }
    if task.retries != current.retries {
        let _ = writeln!(out, "            \"retries\": {} -> {},", current.retries, task.retries);
    }
    if task.timeout.trim() != current.timeout.trim() {
        let _ = writeln!(
            out,
            "            \"timeout\": {} -> {},",
            quote(&current.timeout),
            quote(&task.timeout)
        );
    }
    let _ = writeln!(out, "            \"status\": {}", quote(current.status.as_str()));
    out.push_str("          }");
}

fn find_workflow<'a>(workflows: &'a [Workflow], name: &str) -> Option<&'a Workflow> {
    workflows.iter().find(|w| w.name == name)
}

/// JSON string literal, so commands with quotes render unambiguously.
fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn format_list(items: &[String]) -> String {
    items.iter().map(|s| quote(s)).collect::<Vec<_>>().join(", ")
}
