//! DAGMan manifest throttling a batch through one shared category.
//!
//! Shape:
//!   JOB job0 /jobs/alice_.../job_0.job
//!   CATEGORY job0 fly
//!   ...
//!   MAXJOBS fly 4

use crate::naming::JobDescriptor;
use anyhow::Context;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "dagman.dag";

/// Category every batch node belongs to.
pub const THROTTLE_CATEGORY: &str = "fly";

/// Write `dagman.dag` into `job_dir` and return its path.
///
/// Nodes appear in the order given, which is slot order when fed from
/// `batch::expand`. A zero cap is not representable; unlimited batches
/// are submitted directly instead.
pub fn compose(
    job_dir: &Path,
    descriptors: &[JobDescriptor],
    cap: NonZeroU32,
) -> anyhow::Result<PathBuf> {
    let path = job_dir.join(MANIFEST_FILE);
    fs::write(&path, render_manifest(descriptors, cap))
        .with_context(|| format!("write DAG manifest {}", path.display()))?;
    Ok(path)
}

pub fn render_manifest(descriptors: &[JobDescriptor], cap: NonZeroU32) -> String {
    let mut out = String::new();
    for (i, job) in descriptors.iter().enumerate() {
        let node = format!("job{}", job.slot.unwrap_or(i));
        out.push_str(&format!("JOB {} {}\n", node, job.descriptor.display()));
        out.push_str(&format!("CATEGORY {} {}\n", node, THROTTLE_CATEGORY));
    }
    out.push_str(&format!("MAXJOBS {} {}\n", THROTTLE_CATEGORY, cap));
    out
}
