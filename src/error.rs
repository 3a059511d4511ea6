//! Precondition errors: problems detected before any artifact is written.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("jobs must be dispatched from {required} (current host: {actual})")]
    WrongHost { required: String, actual: String },

    #[error("unable to find the specified commands file: {}", .0.display())]
    MissingCommandsSource(PathBuf),

    #[error("unable to read the commands file {}: {reason}", .path.display())]
    UnreadableCommandsSource { path: PathBuf, reason: String },

    #[error("the commands file {} contains no commands", .0.display())]
    EmptyCommandsSource(PathBuf),

    #[error("failed to find the specified {kind} directory: {}", .path.display())]
    MissingEnvironment { kind: &'static str, path: PathBuf },

    #[error("cannot specify both a virtual environment and a conda environment")]
    ConflictingEnvironments,

    #[error("--conda-name requires --conda")]
    CondaNameWithoutRoot,

    #[error("--queue-count only applies to --command; use one line per job in the commands file")]
    RepeatWithCommandsSource,

    #[error("invalid queue count {0}: a job cannot be queued a negative number of times")]
    NegativeRepeat(i64),

    #[error("invalid {what}: {value}")]
    InvalidResource { what: &'static str, value: String },

    #[error("invalid concurrency cap {0}: must be 0 (unlimited) or greater")]
    NegativeConcurrencyCap(i64),

    #[error("{what} {value} is too large (at most {max})", max = u32::MAX)]
    OutOfRange { what: &'static str, value: i64 },

    #[error("--{flag} must be a single line")]
    MultiLineValue { flag: &'static str },

    #[error("invalid job name {0:?}: use letters, digits, '.', '_' or '-'")]
    InvalidJobName(String),

    #[error("invalid user identity {0:?}")]
    InvalidUser(String),
}

/// Every problem found while validating one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<PreconditionError>);

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invalid job arguments:")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "\t{}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
