//! Command-line job arguments and their validation into a `JobSpec`.
//!
//! Numeric flags are parsed signed so that negative input reaches
//! `validate_and_build` and gets a descriptive message instead of a
//! generic parse error.

use crate::batch;
use crate::error::{PreconditionError, ValidationErrors};
use crate::spec::job::{Environment, JobSpec, Resources, Workload};
use clap::{ArgGroup, Args};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static JOB_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("job name pattern compiles")
});

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("work").required(true).args(["command", "commands_file"])))]
pub struct JobArgs {
    /// Command line to run (executable plus arguments).
    #[arg(long)]
    pub command: Option<String>,

    /// File with one command line per job.
    #[arg(long)]
    pub commands_file: Option<PathBuf>,

    /// Python virtual environment to activate.
    #[arg(long)]
    pub venv: Option<PathBuf>,

    /// Conda installation root to source.
    #[arg(long)]
    pub conda: Option<PathBuf>,

    /// Conda environment to activate (requires --conda).
    #[arg(long)]
    pub conda_name: Option<String>,

    /// Run after normal priority jobs.
    #[arg(long)]
    pub low_prio: bool,

    /// Name for the job (used as batch name and file stem).
    #[arg(long)]
    pub name: Option<String>,

    /// Directory holding job directories.
    #[arg(long, default_value = ".condor_jobs")]
    pub condor_dir: PathBuf,

    /// CPU cores to allocate.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub cores: i64,

    /// Main memory to allocate, in GB.
    #[arg(long, default_value_t = 8, allow_negative_numbers = true)]
    pub mem: i64,

    /// Number of GPUs needed.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub gpus: i64,

    /// GPU memory needed, in GB.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub gpu_mem: f64,

    /// HTCondor requirements expression.
    #[arg(long)]
    pub requirements: Option<String>,

    /// HTCondor rank expression.
    #[arg(long)]
    pub rank: Option<String>,

    /// Times to queue the command (only with --command).
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub queue_count: i64,

    /// Max concurrently running jobs from a commands file; 0 is unlimited.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub max_concurrent: i64,
}

impl JobArgs {
    /// Validate every argument and build the immutable job spec.
    ///
    /// Relative paths resolve against `cwd`. All problems are reported
    /// together rather than stopping at the first one.
    pub fn validate_and_build(&self, cwd: &Path) -> Result<JobSpec, ValidationErrors> {
        let mut errors = Vec::new();

        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(n) = name {
            if !JOB_NAME_RE.is_match(n) {
                errors.push(PreconditionError::InvalidJobName(n.to_string()));
            }
        }

        let resources = self.resources(&mut errors);
        let environment = self.environment(cwd, &mut errors);
        let workload = self.workload(cwd, &mut errors);

        let concurrency_cap = match u32::try_from(self.max_concurrent) {
            Ok(cap) => Some(cap),
            Err(_) if self.max_concurrent < 0 => {
                errors.push(PreconditionError::NegativeConcurrencyCap(self.max_concurrent));
                None
            }
            Err(_) => {
                errors.push(PreconditionError::OutOfRange {
                    what: "concurrency cap",
                    value: self.max_concurrent,
                });
                None
            }
        };

        // Each of these becomes one line of the submit description.
        for (flag, value) in [
            ("command", &self.command),
            ("requirements", &self.requirements),
            ("rank", &self.rank),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().contains(['\n', '\r'])) {
                errors.push(PreconditionError::MultiLineValue { flag });
            }
        }

        if !errors.is_empty() {
            return Err(ValidationErrors(errors));
        }

        // Every Option below is Some once no error was recorded.
        match (resources, environment, workload, concurrency_cap) {
            (Some(resources), Some(environment), Some(workload), Some(concurrency_cap)) => Ok(JobSpec {
                name: name.map(str::to_string),
                resources,
                low_priority: self.low_prio,
                requirements: non_empty(self.requirements.as_deref()),
                rank: non_empty(self.rank.as_deref()),
                environment,
                workload,
                concurrency_cap,
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }

    fn resources(&self, errors: &mut Vec<PreconditionError>) -> Option<Resources> {
        let before = errors.len();
        let mut invalid = |what: &'static str, value: String| {
            errors.push(PreconditionError::InvalidResource { what, value });
        };

        let cores = positive_u32(self.cores, 1);
        if cores.is_none() {
            invalid("number of cores", self.cores.to_string());
        }
        let memory_gb = positive_u32(self.mem, 1);
        if memory_gb.is_none() {
            invalid("amount of RAM", self.mem.to_string());
        }
        let gpus = positive_u32(self.gpus, 0);
        if gpus.is_none() {
            invalid("number of GPUs", self.gpus.to_string());
        }
        if !self.gpu_mem.is_finite() || self.gpu_mem < 0.0 {
            invalid("amount of GPU memory", self.gpu_mem.to_string());
        }

        if errors.len() > before {
            return None;
        }
        Some(Resources {
            cores: cores?,
            memory_gb: memory_gb?,
            gpus: gpus?,
            gpu_memory_gb: self.gpu_mem,
        })
    }

    fn environment(&self, cwd: &Path, errors: &mut Vec<PreconditionError>) -> Option<Environment> {
        let before = errors.len();

        if let Some(venv) = &self.venv {
            let path = cwd.join(venv);
            if !path.is_dir() {
                errors.push(PreconditionError::MissingEnvironment {
                    kind: "venv",
                    path: path.clone(),
                });
            }
        }
        if let Some(conda) = &self.conda {
            let path = cwd.join(conda);
            if !path.is_dir() {
                errors.push(PreconditionError::MissingEnvironment {
                    kind: "conda",
                    path: path.clone(),
                });
            }
        }

        let conda_name = non_empty(self.conda_name.as_deref());
        let env = match (&self.venv, &self.conda) {
            (Some(_), Some(_)) => {
                errors.push(PreconditionError::ConflictingEnvironments);
                None
            }
            (Some(venv), None) => {
                if conda_name.is_some() {
                    errors.push(PreconditionError::CondaNameWithoutRoot);
                }
                Some(Environment::Virtual {
                    path: cwd.join(venv),
                })
            }
            (None, Some(conda)) => Some(Environment::Managed {
                root: cwd.join(conda),
                name: conda_name,
            }),
            (None, None) => {
                if conda_name.is_some() {
                    errors.push(PreconditionError::CondaNameWithoutRoot);
                }
                Some(Environment::None)
            }
        };

        if errors.len() > before { None } else { env }
    }

    fn workload(&self, cwd: &Path, errors: &mut Vec<PreconditionError>) -> Option<Workload> {
        let before = errors.len();

        if self.queue_count < 0 {
            errors.push(PreconditionError::NegativeRepeat(self.queue_count));
        }

        let workload = match (&self.command, &self.commands_file) {
            (_, Some(file)) => {
                let path = cwd.join(file);
                if !path.is_file() {
                    errors.push(PreconditionError::MissingCommandsSource(path.clone()));
                } else {
                    match batch::count_commands(&path) {
                        Ok(0) => errors.push(PreconditionError::EmptyCommandsSource(path.clone())),
                        Ok(_) => {}
                        Err(e) => errors.push(e),
                    }
                }
                if self.queue_count > 1 {
                    errors.push(PreconditionError::RepeatWithCommandsSource);
                }
                Some(Workload::CommandsSource { path })
            }
            (Some(command), None) => match u32::try_from(self.queue_count) {
                Ok(repeat) => Some(Workload::Command {
                    line: command.trim().to_string(),
                    repeat,
                }),
                Err(_) => {
                    if self.queue_count > 0 {
                        errors.push(PreconditionError::OutOfRange {
                            what: "queue count",
                            value: self.queue_count,
                        });
                    }
                    None
                }
            },
            // clap's "work" group requires one of the two.
            (None, None) => None,
        };

        if errors.len() > before { None } else { workload }
    }
}

fn positive_u32(value: i64, min: i64) -> Option<u32> {
    if value < min {
        return None;
    }
    u32::try_from(value).ok()
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
