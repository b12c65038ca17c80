// src/workflow/mod.rs

//! Workflow definitions and where they come from.
//!
//! - [`model`] holds the immutable `Workflow` / `Task` definitions the engine
//!   consumes.
//! - [`extractor`] turns one task file into its properties. The extractor is
//!   a trait so callers can inject their own.
//! - [`parser`] walks a directory tree: directories holding `*.md` files are
//!   workflows, each `*.md` file is a task, and `<task>_dependencies`
//!   symlinks are dependency edges.
//! - [`scaffold`] backs the `init` command.

pub mod extractor;
pub mod model;
pub mod parser;
pub mod scaffold;

pub use extractor::{MarkdownExtractor, TaskPropertyExtractor, TaskProps};
pub use model::{Task, TaskId, Workflow};
pub use parser::WorkflowParser;
