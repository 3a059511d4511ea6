//! Generation pipeline: job directory, descriptors, optional DAG manifest,
//! submission record.

use crate::batch;
use crate::context::Context;
use crate::dispatch::Submission;
use crate::naming::{JobDescriptor, JobDirectory, allocate_job_directory};
use crate::render::{build_descriptor, compose};
use crate::spec::{JobSpec, Workload};
use anyhow::Context as _;
use serde::Serialize;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use tracing::info;

pub const RECORD_FILE: &str = "submission.json";

/// Everything written for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    pub job_dir: PathBuf,
    pub submission: Submission,
    pub jobs: Vec<JobDescriptor>,
}

#[derive(Serialize)]
struct SubmissionRecord<'a> {
    user: &'a str,
    host: &'a str,
    spec: &'a JobSpec,
    #[serde(flatten)]
    generated: &'a Generated,
}

/// Write all artifacts for `spec` under `base_dir` and describe the result.
///
/// The host check runs before anything touches the filesystem.
pub fn generate(ctx: &Context, spec: &JobSpec, base_dir: &Path) -> anyhow::Result<Generated> {
    ctx.ensure_dispatch_host()?;

    let path = allocate_job_directory(&ctx.cwd.join(base_dir), &ctx.user)?;
    info!(job_dir = %path.display(), "allocated job directory");
    let job_dir = JobDirectory::new(path, spec.name.as_deref(), ctx.cwd.clone());

    let (submission, jobs) = match (&spec.workload, NonZeroU32::new(spec.concurrency_cap)) {
        (Workload::CommandsSource { path: source }, Some(cap)) => {
            let jobs = batch::expand(&job_dir, source, spec)?;
            let manifest = compose(&job_dir.path, &jobs, cap)?;
            info!(jobs = jobs.len(), %cap, manifest = %manifest.display(), "composed DAG");
            (Submission::Dag { manifest, cap }, jobs)
        }
        _ => {
            let job = build_descriptor(&job_dir, None, spec)?;
            info!(descriptor = %job.descriptor.display(), "wrote descriptor");
            (
                Submission::Direct {
                    descriptor: job.descriptor.clone(),
                },
                vec![job],
            )
        }
    };

    let generated = Generated {
        job_dir: job_dir.path,
        submission,
        jobs,
    };
    write_record(ctx, spec, &generated)?;
    Ok(generated)
}

fn write_record(ctx: &Context, spec: &JobSpec, generated: &Generated) -> anyhow::Result<()> {
    let record = SubmissionRecord {
        user: &ctx.user,
        host: &ctx.host,
        spec,
        generated,
    };
    let path = generated.job_dir.join(RECORD_FILE);
    let json = serde_json::to_string_pretty(&record)?;
    fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
