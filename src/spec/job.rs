//! Validated, immutable job description.
//!
//! Mutually exclusive options are sum types here, so "both set" and
//! "neither set" cannot be represented once validation has passed.

use serde::Serialize;
use std::path::PathBuf;

/// Resource requests. Validation guarantees cores >= 1, memory_gb >= 1 and
/// a non-negative, finite gpu_memory_gb.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resources {
    pub cores: u32,
    pub memory_gb: u32,
    pub gpus: u32,
    pub gpu_memory_gb: f64,
}

impl Resources {
    /// `CUDAGlobalMemoryMb` threshold, or None when no GPU is requested.
    pub fn gpu_memory_threshold_mb(&self) -> Option<u64> {
        if self.gpus == 0 {
            return None;
        }
        Some((self.gpu_memory_gb * 1000.0).round() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Environment {
    None,
    /// Python virtualenv directory (contains `bin/activate`).
    Virtual { path: PathBuf },
    /// Conda installation root, plus the environment to activate.
    Managed { root: PathBuf, name: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    /// One command line, queued `repeat` times (0 writes no queue statement).
    Command { line: String, repeat: u32 },
    /// A file with one command per line.
    CommandsSource { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSpec {
    pub name: Option<String>,
    pub resources: Resources,
    pub low_priority: bool,
    pub requirements: Option<String>,
    pub rank: Option<String>,
    pub environment: Environment,
    pub workload: Workload,
    /// Max simultaneously running batch jobs; 0 means unlimited.
    pub concurrency_cap: u32,
}

impl JobSpec {
    /// Same job, running `line` once instead of the current workload.
    pub fn with_command(&self, line: &str) -> JobSpec {
        JobSpec {
            workload: Workload::Command {
                line: line.to_string(),
                repeat: 1,
            },
            ..self.clone()
        }
    }

    /// True when the descriptor queues more than one process.
    pub fn queues_many(&self) -> bool {
        match &self.workload {
            Workload::Command { repeat, .. } => *repeat > 1,
            Workload::CommandsSource { .. } => true,
        }
    }
}
