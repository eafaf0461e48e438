use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use crate::adapters::inference::MissingJobId;
use crate::adapters::input::FileInputAdapter;
use crate::adapters::output::ResultWriter;
use crate::adapters::runpod::RunPod;
use crate::core::job::JobOutcome;
use crate::core::runner::JobRunner;
use crate::utils::config::{Config, MissingConfiguration};
use crate::utils::lib::*;

pub async fn run_cli_interface() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let result = match Config::from_env(&args.api_base) {
        Ok(config) => run_job(&args, config).await,
        Err(e) => Err(e),
    };
    ExitCode::from(exit_status(&result))
}

/// Reports how the run ended and picks the process exit status. Missing
/// credentials and a submit response without a job ID exit with 1; every
/// other failure is logged with its full cause chain and exits with 0.
pub fn exit_status(result: &Result<JobOutcome>) -> u8 {
    match result {
        Ok(outcome) => {
            report_outcome(outcome);
            0
        }
        Err(e) if is_fatal(e) => {
            error!("{:#}", e);
            1
        }
        Err(e) => {
            error!("Unexpected error: {:?}", e);
            0
        }
    }
}

fn is_fatal(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.is::<MissingConfiguration>() || cause.is::<MissingJobId>())
}

async fn run_job(args: &Args, config: Config) -> Result<JobOutcome> {
    let writer = ResultWriter::create(args.resolved_results_dir())
        .context("Failed to prepare results directory")?;

    let request = FileInputAdapter::new(args.workdir.clone())
        .build_request()
        .context("Failed to load inputs")?;

    let runner = JobRunner::new(RunPod::new(config), writer)
        .with_poll_settings(args.poll_settings())
        .with_fallback_thresholds(args.fallback_thresholds());

    runner.run(&request).await
}

fn report_outcome(outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Completed(report) => info!(
            "Job finished: {} image(s) saved, {} skipped",
            report.saved.len(),
            report.skipped
        ),
        JobOutcome::Failed { detail } => error!("Job failed: {}", detail),
        JobOutcome::TimedOut { waited } => {
            error!("Gave up waiting for the job after {}s", waited.as_secs())
        }
    }
}
