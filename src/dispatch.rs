//! Hand-off to the HTCondor command-line tools.
//!
//! Dispatch is fire-and-forget: exit status and spawn failures are logged,
//! never returned to the caller.

use serde::Serialize;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// What the pipeline produced for the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Submission {
    /// One submit description, possibly queueing many processes.
    Direct { descriptor: PathBuf },
    /// A DAGMan manifest throttled to `cap` running jobs.
    Dag { manifest: PathBuf, cap: NonZeroU32 },
}

impl Submission {
    /// The top-level file handed to the scheduler.
    pub fn path(&self) -> &Path {
        match self {
            Submission::Direct { descriptor } => descriptor.as_path(),
            Submission::Dag { manifest, .. } => manifest.as_path(),
        }
    }
}

pub trait Dispatcher {
    fn dispatch(&self, submission: &Submission);
}

/// Runs `condor_submit` / `condor_submit_dag`.
#[derive(Debug, Clone)]
pub struct CondorCli {
    pub submit_bin: String,
    pub submit_dag_bin: String,
}

impl Default for CondorCli {
    fn default() -> Self {
        Self {
            submit_bin: "condor_submit".to_string(),
            submit_dag_bin: "condor_submit_dag".to_string(),
        }
    }
}

impl CondorCli {
    pub fn command(&self, submission: &Submission) -> Command {
        match submission {
            Submission::Direct { descriptor } => {
                let mut cmd = Command::new(&self.submit_bin);
                cmd.arg(descriptor);
                cmd
            }
            Submission::Dag { manifest, cap } => {
                let mut cmd = Command::new(&self.submit_dag_bin);
                cmd.arg("-maxjobs").arg(cap.to_string()).arg(manifest);
                cmd
            }
        }
    }
}

impl Dispatcher for CondorCli {
    fn dispatch(&self, submission: &Submission) {
        let mut cmd = self.command(submission);
        info!(command = ?cmd, "dispatching");
        match cmd.status() {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(%status, "scheduler reported a failure"),
            Err(e) => warn!(program = ?cmd.get_program(), error = %e, "could not run scheduler"),
        }
    }
}
