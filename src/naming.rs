//! Job directory naming and per-job artifact paths.

use crate::error::PreconditionError;
use anyhow::Context;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File stem used when the job has no name.
pub const DEFAULT_STEM: &str = "job";

/// Create a fresh `{user}_{YYYYMMDD_HHMMSS_micros}` directory under `base_dir`.
pub fn allocate_job_directory(base_dir: &Path, user: &str) -> anyhow::Result<PathBuf> {
    allocate_job_directory_with(base_dir, user, Local::now)
}

/// Same as `allocate_job_directory`, sampling time from `now`.
///
/// Only the final `create_dir` decides whether a name is free: when the
/// candidate already exists the clock is re-sampled. Any other failure is
/// returned. There is no cross-process locking beyond that.
pub fn allocate_job_directory_with<F>(base_dir: &Path, user: &str, mut now: F) -> anyhow::Result<PathBuf>
where
    F: FnMut() -> DateTime<Local>,
{
    if user.is_empty() || user.contains(['/', '\\']) || user.starts_with('.') {
        return Err(PreconditionError::InvalidUser(user.to_string()).into());
    }

    fs::create_dir_all(base_dir)
        .with_context(|| format!("create job base directory {}", base_dir.display()))?;

    loop {
        let candidate = base_dir.join(candidate_name(user, now()));
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "job directory exists; re-rolling");
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("create job directory {}", candidate.display()));
            }
        }
    }
}

fn candidate_name(user: &str, at: DateTime<Local>) -> String {
    format!("{}_{}", user, at.format("%Y%m%d_%H%M%S_%6f"))
}

/// An allocated job directory plus the naming scheme for its artifacts.
#[derive(Debug, Clone)]
pub struct JobDirectory {
    pub path: PathBuf,
    /// Stem shared by every artifact file (job name, or `job`).
    pub stem: String,
    /// Directory the jobs start in on the execute node.
    pub submit_dir: PathBuf,
}

impl JobDirectory {
    pub fn new(path: PathBuf, name: Option<&str>, submit_dir: PathBuf) -> Self {
        Self {
            path,
            stem: name.unwrap_or(DEFAULT_STEM).to_string(),
            submit_dir,
        }
    }

    /// Artifact paths for one job. `per_process` inserts HTCondor's
    /// `$(Process)` macro into the log names.
    pub fn descriptor_paths(&self, slot: Option<usize>, per_process: bool) -> JobDescriptor {
        let base = match slot {
            Some(i) => format!("{}_{}", self.stem, i),
            None => self.stem.clone(),
        };
        let log_base = if per_process {
            format!("{}.$(Process)", base)
        } else {
            base.clone()
        };
        let at = |name: String| self.path.join(name);

        JobDescriptor {
            slot,
            descriptor: at(format!("{}.job", base)),
            wrapper: at(format!("{}.sh", base)),
            stdout: at(format!("{}.out", log_base)),
            stderr: at(format!("{}.err", log_base)),
            log: at(format!("{}.log", log_base)),
        }
    }
}

/// Resolved paths for one scheduled unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDescriptor {
    pub slot: Option<usize>,
    pub descriptor: PathBuf,
    pub wrapper: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub log: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn at(micros: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 10, 19, 14, 3, 7)
            .single()
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(micros as i64))
            .unwrap()
    }

    #[test]
    fn name_is_user_and_microsecond_timestamp() {
        let base = TempDir::new().unwrap();
        let dir = allocate_job_directory_with(base.path(), "alice", || at(42)).unwrap();
        assert_eq!(dir, base.path().join("alice_20261019_140307_000042"));
        assert!(dir.is_dir());
    }

    #[test]
    fn creates_missing_parents() {
        let base = TempDir::new().unwrap();
        let nested = base.path().join("a").join(".condor_jobs");
        let dir = allocate_job_directory(&nested, "alice").unwrap();
        assert!(dir.starts_with(&nested));
        assert!(dir.is_dir());
    }

    #[test]
    fn forced_collision_re_rolls() {
        let base = TempDir::new().unwrap();
        let first = allocate_job_directory_with(base.path(), "alice", || at(7)).unwrap();

        // Same instant again, then the clock moves on.
        let mut ticks = vec![at(8), at(7)];
        let second =
            allocate_job_directory_with(base.path(), "alice", || ticks.pop().unwrap()).unwrap();

        assert_ne!(first, second);
        assert_eq!(second, base.path().join("alice_20261019_140307_000008"));
        assert!(ticks.is_empty());
    }

    #[test]
    fn any_existing_entry_counts_as_taken() {
        let base = TempDir::new().unwrap();
        fs::write(base.path().join("alice_20261019_140307_000001"), "").unwrap();

        let mut ticks = vec![at(2), at(1)];
        let dir =
            allocate_job_directory_with(base.path(), "alice", || ticks.pop().unwrap()).unwrap();
        assert_eq!(dir, base.path().join("alice_20261019_140307_000002"));
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn other_create_failures_are_not_retried() {
        use std::os::unix::fs::PermissionsExt;

        let base = TempDir::new().unwrap();
        let locked = base.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();
        // Root ignores directory permissions.
        if fs::create_dir(locked.join("check")).is_ok() {
            return;
        }

        let mut calls = 0;
        let result = allocate_job_directory_with(&locked, "alice", || {
            calls += 1;
            at(calls)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn rejects_path_like_user() {
        let base = TempDir::new().unwrap();
        let err = allocate_job_directory(base.path(), "../root").unwrap_err();
        assert_eq!(
            err.downcast_ref::<PreconditionError>(),
            Some(&PreconditionError::InvalidUser("../root".to_string()))
        );
    }

    #[test]
    fn per_process_paths_carry_the_process_macro() {
        let dir = JobDirectory::new(
            PathBuf::from("/jobs/alice_1"),
            Some("sweep"),
            PathBuf::from("/home/alice"),
        );
        let one = dir.descriptor_paths(None, false);
        assert_eq!(one.descriptor, PathBuf::from("/jobs/alice_1/sweep.job"));
        assert_eq!(one.stdout, PathBuf::from("/jobs/alice_1/sweep.out"));

        let many = dir.descriptor_paths(Some(3), true);
        assert_eq!(many.descriptor, PathBuf::from("/jobs/alice_1/sweep_3.job"));
        assert_eq!(many.wrapper, PathBuf::from("/jobs/alice_1/sweep_3.sh"));
        assert_eq!(many.stderr, PathBuf::from("/jobs/alice_1/sweep_3.$(Process).err"));
        assert_eq!(many.log, PathBuf::from("/jobs/alice_1/sweep_3.$(Process).log"));
    }
}
