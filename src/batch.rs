//! Batch expansion: one descriptor per line of a commands file.
//!
//! A read error partway through the file (e.g. invalid UTF-8) is reported
//! as an unreadable source, but descriptors for the earlier slots have
//! already been written by then and are left in place. Validation reads
//! the whole file up front with `count_commands`, so this only happens if
//! the file changes in between.

use crate::error::PreconditionError;
use crate::naming::{JobDescriptor, JobDirectory};
use crate::render::build_descriptor;
use crate::spec::JobSpec;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// Build one descriptor per non-empty line of `source`, slots 0..N in
/// file order.
///
/// The file is opened before anything is written, so a missing or
/// unreadable source fails without leaving descriptors behind.
pub fn expand(
    job_dir: &JobDirectory,
    source: &Path,
    base: &JobSpec,
) -> anyhow::Result<Vec<JobDescriptor>> {
    let file = open_source(source)?;

    let mut jobs = Vec::new();
    for (slot, line) in command_lines(BufReader::new(file)).enumerate() {
        let line = line.map_err(|e| unreadable(source, &e))?;
        debug!(slot, command = %line, "expanding batch job");
        jobs.push(build_descriptor(job_dir, Some(slot), &base.with_command(&line))?);
    }

    if jobs.is_empty() {
        return Err(PreconditionError::EmptyCommandsSource(source.to_path_buf()).into());
    }
    Ok(jobs)
}

/// Number of commands in `source`, reading it to the end.
pub fn count_commands(source: &Path) -> Result<usize, PreconditionError> {
    let file = open_source(source)?;
    let mut n = 0;
    for line in command_lines(BufReader::new(file)) {
        line.map_err(|e| unreadable(source, &e))?;
        n += 1;
    }
    Ok(n)
}

fn open_source(source: &Path) -> Result<File, PreconditionError> {
    File::open(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => PreconditionError::MissingCommandsSource(source.to_path_buf()),
        _ => unreadable(source, &e),
    })
}

fn unreadable(source: &Path, e: &io::Error) -> PreconditionError {
    PreconditionError::UnreadableCommandsSource {
        path: source.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Lazily yield each line with trailing whitespace removed, skipping blank lines.
pub fn command_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(l) => {
            let l = l.trim_end();
            (!l.is_empty()).then(|| Ok(l.to_string()))
        }
        Err(e) => Some(Err(e)),
    })
}
