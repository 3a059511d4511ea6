//! HTCondor submit description for one job.

use crate::naming::{JobDescriptor, JobDirectory};
use crate::render::wrapper::build_wrapper;
use crate::spec::{Environment, JobSpec, Workload};
use anyhow::Context;
use std::fs;
use std::path::Path;

/// `priority` value written for low-priority jobs.
pub const LOW_PRIORITY: i32 = -10;

/// Write the wrapper and submit description for one job and return its paths.
///
/// `slot` is the job's position in a batch, or None for a direct job.
/// Rebuilding the same slot replaces both files.
pub fn build_descriptor(
    job_dir: &JobDirectory,
    slot: Option<usize>,
    spec: &JobSpec,
) -> anyhow::Result<JobDescriptor> {
    let job = job_dir.descriptor_paths(slot, spec.queues_many());

    build_wrapper(&job.wrapper, &spec.environment)?;

    let text = render_descriptor(&job, &job_dir.submit_dir, spec);
    fs::write(&job.descriptor, text)
        .with_context(|| format!("write descriptor {}", job.descriptor.display()))?;

    Ok(job)
}

/// Render the submit description. Line order is significant: a later
/// `requirements` line replaces an earlier one.
pub fn render_descriptor(job: &JobDescriptor, submit_dir: &Path, spec: &JobSpec) -> String {
    let mut lines = Vec::new();
    let res = &spec.resources;

    if let Some(name) = &spec.name {
        lines.push(format!("batch_name = \"{}\"", name));
    }
    lines.push(format!("request_cpus = {}", res.cores));
    lines.push(format!("request_memory = {} GB", res.memory_gb));
    lines.push(format!("request_gpus = {}", res.gpus));
    if spec.low_priority {
        lines.push(format!("priority = {}", LOW_PRIORITY));
    }
    if let Some(mb) = res.gpu_memory_threshold_mb() {
        lines.push(format!("requirements = (CUDAGlobalMemoryMb >= {})", mb));
    }
    if let Some(req) = &spec.requirements {
        lines.push(format!("requirements = {}", req));
    }
    if let Some(rank) = &spec.rank {
        lines.push(format!("rank = {}", rank));
    }

    lines.push(format!("output = {}", job.stdout.display()));
    lines.push(format!("error  = {}", job.stderr.display()));
    lines.push(format!("log    = {}", job.log.display()));
    lines.push(format!("initialdir = {}", submit_dir.display()));

    if let Environment::Virtual { path } = &spec.environment {
        lines.push(format!("environment = \"PYENV={}\"", path.display()));
    }
    lines.push(format!("executable = {}", job.wrapper.display()));

    match &spec.workload {
        Workload::CommandsSource { path } => {
            lines.push("arguments = $(command)".to_string());
            lines.push(format!("queue command from {}", path.display()));
        }
        Workload::Command { line, repeat } => {
            lines.push(format!("arguments = {}", line));
            match repeat {
                0 => {}
                1 => lines.push("queue".to_string()),
                n => lines.push(format!("queue {}", n)),
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Resources;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn spec(workload: Workload) -> JobSpec {
        JobSpec {
            name: None,
            resources: Resources {
                cores: 2,
                memory_gb: 4,
                gpus: 0,
                gpu_memory_gb: 0.0,
            },
            low_priority: false,
            requirements: None,
            rank: None,
            environment: Environment::None,
            workload,
            concurrency_cap: 0,
        }
    }

    fn command(line: &str, repeat: u32) -> Workload {
        Workload::Command {
            line: line.to_string(),
            repeat,
        }
    }

    fn job_dir(tmp: &TempDir, name: Option<&str>) -> JobDirectory {
        JobDirectory::new(
            tmp.path().to_path_buf(),
            name,
            PathBuf::from("/home/alice/project"),
        )
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn single_command_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, None);
        let job = build_descriptor(&dir, None, &spec(command("echo hi", 1))).unwrap();

        let text = fs::read_to_string(&job.descriptor).unwrap();
        let root = tmp.path().display();
        assert_eq!(
            text,
            format!(
                "request_cpus = 2\n\
                 request_memory = 4 GB\n\
                 request_gpus = 0\n\
                 output = {root}/job.out\n\
                 error  = {root}/job.err\n\
                 log    = {root}/job.log\n\
                 initialdir = /home/alice/project\n\
                 executable = {root}/job.sh\n\
                 arguments = echo hi\n\
                 queue\n"
            )
        );
        assert!(!text.contains("CUDAGlobalMemoryMb"));
        assert!(job.wrapper.is_file());
        assert_eq!(job.slot, None);
    }

    #[test]
    fn queue_directive_follows_repeat_count() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, None);

        let none = render_descriptor(
            &dir.descriptor_paths(None, false),
            &dir.submit_dir,
            &spec(command("echo", 0)),
        );
        assert_eq!(lines(&none).last(), Some(&"arguments = echo"));
        assert!(!none.contains("queue"));

        let five = spec(command("echo", 5));
        let text = render_descriptor(
            &dir.descriptor_paths(None, five.queues_many()),
            &dir.submit_dir,
            &five,
        );
        assert_eq!(lines(&text).last(), Some(&"queue 5"));
        assert!(text.contains(".$(Process).out"));
    }

    #[test]
    fn gpu_memory_requirement_only_with_gpus() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, None);
        let job = dir.descriptor_paths(None, false);

        let mut s = spec(command("train", 1));
        s.resources.gpu_memory_gb = 11.0;
        let text = render_descriptor(&job, &dir.submit_dir, &s);
        assert!(!text.contains("requirements"));

        s.resources.gpus = 2;
        let text = render_descriptor(&job, &dir.submit_dir, &s);
        assert!(lines(&text).contains(&"request_gpus = 2"));
        assert!(lines(&text).contains(&"requirements = (CUDAGlobalMemoryMb >= 11000)"));
    }

    #[test]
    fn optional_directives_in_order() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, Some("sweep"));
        let job = dir.descriptor_paths(None, false);

        let mut s = spec(command("train", 1));
        s.name = Some("sweep".to_string());
        s.low_priority = true;
        s.resources.gpus = 1;
        s.resources.gpu_memory_gb = 8.0;
        s.requirements = Some("(OpSys == \"LINUX\")".to_string());
        s.rank = Some("Memory".to_string());
        let text = render_descriptor(&job, &dir.submit_dir, &s);

        assert_eq!(
            lines(&text)[..8].to_vec(),
            vec![
                "batch_name = \"sweep\"",
                "request_cpus = 2",
                "request_memory = 4 GB",
                "request_gpus = 1",
                "priority = -10",
                "requirements = (CUDAGlobalMemoryMb >= 8000)",
                "requirements = (OpSys == \"LINUX\")",
                "rank = Memory",
            ]
        );
    }

    #[test]
    fn commands_source_queues_from_file() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, None);
        let s = spec(Workload::CommandsSource {
            path: PathBuf::from("/home/alice/cmds.txt"),
        });
        let job = build_descriptor(&dir, None, &s).unwrap();
        let text = fs::read_to_string(&job.descriptor).unwrap();

        let tail: Vec<&str> = lines(&text).into_iter().rev().take(2).collect();
        assert_eq!(
            tail,
            ["queue command from /home/alice/cmds.txt", "arguments = $(command)"]
        );
        assert!(text.contains("job.$(Process).log"));
    }

    #[test]
    fn virtualenv_is_exported_to_the_job() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, None);
        let mut s = spec(command("python run.py", 1));
        s.environment = Environment::Virtual {
            path: PathBuf::from("/home/alice/venv"),
        };
        let job = build_descriptor(&dir, None, &s).unwrap();

        let text = fs::read_to_string(&job.descriptor).unwrap();
        assert!(lines(&text).contains(&"environment = \"PYENV=/home/alice/venv\""));
        let wrapper = fs::read_to_string(&job.wrapper).unwrap();
        assert!(wrapper.contains("/home/alice/venv/bin/activate"));
    }

    #[test]
    fn rebuilding_replaces_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let dir = job_dir(&tmp, None);

        let mut s = spec(command("echo first", 3));
        s.rank = Some("Mips".to_string());
        build_descriptor(&dir, Some(0), &s).unwrap();

        let job = build_descriptor(&dir, Some(0), &spec(command("echo second", 1))).unwrap();
        let text = fs::read_to_string(&job.descriptor).unwrap();
        assert!(!text.contains("first"));
        assert!(!text.contains("rank"));
        assert_eq!(lines(&text).last(), Some(&"queue"));
        assert_eq!(job.slot, Some(0));
    }
}
