// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod output;
pub mod state;
pub mod types;
pub mod workflow;

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::{ApplyArgs, CliArgs, Command, InitArgs, PlanArgs};
use crate::config::model::ConfigFile;
use crate::config::{default_config_path, load_and_validate, load_or_default};
use crate::engine::ApplyDriver;
use crate::errors::TaskgraphError;
use crate::exec::{ShellRunner, TaskExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::output::{render_apply_summary, render_plan};
use crate::state::StateStore;
use crate::workflow::{MarkdownExtractor, Workflow, WorkflowParser};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the workflow parser over the real filesystem
/// - the state store and apply driver
/// - Ctrl-C handling for `apply`
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    match &args.command {
        Command::Plan(plan) => plan_command(&cfg, fs, plan),
        Command::Apply(apply) => apply_command(&cfg, fs, apply).await,
        Command::Init(init) => init_command(fs.as_ref(), init),
    }
}

/// An explicit `--config` must exist; the default location is optional.
fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut cfg = match &args.config {
        Some(path) => load_and_validate(path)?,
        None => load_or_default(default_config_path())?,
    };

    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(TaskgraphError::ConfigError("--workers must be at least 1".into()).into());
        }
        cfg.engine.max_workers = workers;
    }
    if let Some(state) = &args.state {
        cfg.state_path = state.clone();
    }

    debug!(?cfg, "effective configuration");
    Ok(cfg)
}

fn parse_workflows(fs: &Arc<dyn FileSystem>, dir: &Path) -> Result<Vec<Workflow>> {
    let extractor = Arc::new(MarkdownExtractor::new(Arc::clone(fs)));
    let parser = WorkflowParser::new(Arc::clone(fs), extractor);
    let workflows = parser.parse_workflows(dir)?;
    info!(dir = ?dir, workflows = workflows.len(), "loaded workflow definitions");
    Ok(workflows)
}

fn driver(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> ApplyDriver {
    let executor = Arc::new(TaskExecutor::new(
        Arc::new(ShellRunner),
        cfg.engine.retry,
        cfg.engine.default_timeout,
    ));
    ApplyDriver::new(StateStore::new(fs, &cfg.state_path), executor, cfg.engine)
}

fn plan_command(cfg: &ConfigFile, fs: Arc<dyn FileSystem>, args: &PlanArgs) -> Result<()> {
    let workflows = parse_workflows(&fs, &args.dir)?;
    let (current, plan) = driver(cfg, fs).plan(&workflows)?;
    print!("{}", render_plan(&plan, &workflows, &current));
    Ok(())
}

async fn apply_command(cfg: &ConfigFile, fs: Arc<dyn FileSystem>, args: &ApplyArgs) -> Result<()> {
    let workflows = parse_workflows(&fs, &args.dir)?;
    let driver = driver(cfg, fs);
    let (current, plan) = driver.plan(&workflows)?;

    if !plan.has_changes() && !args.force {
        println!("No changes to apply");
        return Ok(());
    }
    print!("{}", render_plan(&plan, &workflows, &current));

    if !args.auto_approve && !confirm("\nDo you want to apply these changes? [y/N] ")? {
        println!("Apply cancelled");
        return Ok(());
    }

    // Ctrl-C cancels every workflow; the state is still persisted.
    let root = CancellationToken::new();
    {
        let root = root.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            eprintln!("\nReceived interrupt signal, cancelling workflows...");
            root.cancel();
        });
    }

    let report = driver.apply(workflows, &root).await?;
    print!("{}", render_apply_summary(&report));
    report.into_result()?;
    Ok(())
}

fn init_command(fs: &dyn FileSystem, args: &InitArgs) -> Result<()> {
    let dir = workflow::scaffold::create_workflow(fs, &args.dir, &args.name)?;
    println!(
        "Initialized workflow in {} with {}",
        dir.display(),
        workflow::scaffold::EXAMPLE_TASK_FILE
    );
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = std::io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut response = String::new();
    std::io::stdin().lock().read_line(&mut response)?;
    Ok(matches!(response.trim(), "y" | "Y" | "yes"))
}
