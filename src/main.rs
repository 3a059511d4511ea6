use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod batch;
mod context;
mod dispatch;
mod error;
mod naming;
mod pipeline;
mod render;
mod spec;

use dispatch::Dispatcher;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "fly")]
#[command(about = "Generate and submit HTCondor jobs", long_about = None)]
struct Cli {
    /// Host jobs must be dispatched from; pass "" to skip the check.
    #[arg(
        long,
        global = true,
        env = "FLY_DISPATCH_HOST",
        default_value = context::DEFAULT_DISPATCH_HOST
    )]
    dispatch_host: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the job files and hand them to condor_submit / condor_submit_dag.
    Submit {
        #[command(flatten)]
        job: spec::JobArgs,
    },
    /// Write the job files only and print the file to submit.
    Generate {
        #[command(flatten)]
        job: spec::JobArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = context::Context::from_process(Some(cli.dispatch_host))?;

    match cli.cmd {
        Commands::Submit { job } => {
            let generated = generate(&ctx, &job)?;
            dispatch::CondorCli::default().dispatch(&generated.submission);
        }
        Commands::Generate { job } => {
            let generated = generate(&ctx, &job)?;
            println!("Wrote {}", generated.submission.path().display());
        }
    }

    Ok(())
}

fn generate(ctx: &context::Context, job: &spec::JobArgs) -> Result<pipeline::Generated> {
    // 1) Validate every argument before touching the filesystem.
    let job_spec = job.validate_and_build(&ctx.cwd)?;

    // 2) Write the job directory, descriptors and optional DAG.
    pipeline::generate(ctx, &job_spec, &job.condor_dir)
}
