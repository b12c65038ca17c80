// src/dag/mod.rs

//! Task dependency graph.
//!
//! [`graph::DependencyGraph`] validates a workflow definition and answers
//! the two questions the scheduler asks: which tasks can start now, and
//! which tasks a completion just unblocked.

pub mod graph;

pub use graph::DependencyGraph;
