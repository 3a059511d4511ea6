//! Process-wide facts gathered once and passed explicitly into the core.

use crate::error::PreconditionError;
use anyhow::{Context as _, anyhow};
use std::env;
use std::path::PathBuf;

/// Host that jobs must be dispatched from unless overridden.
pub const DEFAULT_DISPATCH_HOST: &str = "csci-head.cluster.cs.wwu.edu";

#[derive(Debug, Clone)]
pub struct Context {
    /// Login name, used as the job directory namespace.
    pub user: String,
    /// Name of the host this process runs on.
    pub host: String,
    /// Working directory; relative paths resolve against it.
    pub cwd: PathBuf,
    /// Host jobs must be dispatched from. None disables the check.
    pub dispatch_host: Option<String>,
}

impl Context {
    pub fn from_process(dispatch_host: Option<String>) -> anyhow::Result<Self> {
        let user = env::var("USER")
            .or_else(|_| env::var("LOGNAME"))
            .map_err(|_| anyhow!("cannot determine the invoking user (USER and LOGNAME unset)"))?;
        let host = hostname::get()
            .context("read host name")?
            .to_string_lossy()
            .into_owned();
        let cwd = env::current_dir().context("read current directory")?;

        Ok(Self {
            user,
            host,
            cwd,
            dispatch_host: dispatch_host.filter(|h| !h.trim().is_empty()),
        })
    }

    /// Abort unless running on the designated dispatch host.
    pub fn ensure_dispatch_host(&self) -> Result<(), PreconditionError> {
        match &self.dispatch_host {
            Some(required) if required != &self.host => Err(PreconditionError::WrongHost {
                required: required.clone(),
                actual: self.host.clone(),
            }),
            _ => Ok(()),
        }
    }
}
