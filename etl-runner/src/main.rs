//! Pipeline runner binary.
//!
//! Loads runtime settings from `configuration/`, builds the pipeline described by a JSON
//! document and runs it once. SIGINT and SIGTERM cancel the run at its next stage boundary.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use etl_config::shared::RunnerConfig;
use etl_telemetry::tracing::init_tracing;
use tracing::{error, info};

use crate::config::load_runner_config;
use crate::core::run_with_config;
use crate::error::{RunnerError, RunnerResult};

mod config;
mod core;
mod error;

#[derive(Parser)]
#[command(name = "etl-runner", about = "Runs a JSON-configured ETL pipeline")]
struct Args {
    /// Path of the pipeline document, overriding `pipeline_path` from the configuration.
    #[arg(long)]
    pipeline: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match main_impl(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn main_impl(args: Args) -> RunnerResult<()> {
    init_tracing(env!("CARGO_BIN_NAME")).map_err(RunnerError::config)?;

    let runner_config = load_runner_config(args.pipeline)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(runner_config))
}

async fn async_main(runner_config: RunnerConfig) -> RunnerResult<()> {
    match run_with_config(runner_config).await {
        Ok(report) => {
            info!(
                records_read = report.records_read,
                records_written = report.records_written,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "pipeline finished"
            );

            Ok(())
        }
        Err(err) => {
            error!("{err}");
            Err(err)
        }
    }
}
