// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `taskgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskgraph",
    version,
    about = "Plan and apply task workflows defined as files and symlinks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the engine config file (TOML).
    ///
    /// Default: `Taskgraph.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State file location; overrides `[state] path`.
    #[arg(long, global = true, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Concurrent tasks per workflow; overrides `[engine] max_workers`.
    #[arg(long, global = true, value_name = "N")]
    pub workers: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKGRAPH_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show what an apply would change, without running anything.
    Plan(PlanArgs),
    /// Run every workflow and persist the resulting state.
    Apply(ApplyArgs),
    /// Create a new workflow directory with an example task.
    Init(InitArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Directory holding the workflow definitions.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ApplyArgs {
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Skip the interactive confirmation.
    #[arg(long)]
    pub auto_approve: bool,

    /// Apply even when the plan shows no changes.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    /// Workflow name; lowercased, spaces become `-`.
    pub name: String,

    /// Parent directory of the new workflow.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
