// src/output/mod.rs

//! Human-readable rendering for the command-line surface.

pub mod apply;
pub mod plan;

pub use apply::render_apply_summary;
pub use plan::render_plan;
