//! Spec layer: command-line arguments + validated in-memory job description.
//!
//! This module is intentionally separate from artifact rendering.
//! It owns:
//! - JobArgs (clap surface, raw user input)
//! - JobSpec (validated, sum-typed job description)

pub mod args;
pub mod job;

pub use args::JobArgs;
pub use job::{Environment, JobSpec, Resources, Workload};
