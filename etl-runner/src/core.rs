use std::sync::Arc;

use etl::builder::PipelineBuilder;
use etl::concurrency::shutdown::ShutdownTx;
use etl::pipeline::PipelineReport;
use etl::registry::Registry;
use etl::transform::fetcher::HttpFetcher;
use etl_config::shared::{RunnerConfig, ValidationError};
use etl_connectors::register_builtin_connectors;
use tracing::{info, warn};

use crate::error::{RunnerError, RunnerResult};

/// Builds the configured pipeline and runs it to completion or until a shutdown signal arrives.
pub async fn run_with_config(config: RunnerConfig) -> RunnerResult<PipelineReport> {
    let Some(pipeline_path) = config.pipeline_path.as_deref() else {
        return Err(RunnerError::config(ValidationError::InvalidFieldValue {
            field: "pipeline_path".to_string(),
            constraint: "must be set".to_string(),
        }));
    };

    let registry = Registry::global();
    register_builtin_connectors(&registry);

    let fetcher = Arc::new(HttpFetcher::from_config(&config.http)?);
    let builder = PipelineBuilder::new(registry).with_fetcher(fetcher);

    info!(path = %pipeline_path.display(), "loading pipeline document");
    let mut pipeline = builder.build_from_path(pipeline_path).await?;

    let shutdown_handle = tokio::spawn(listen_for_shutdown(pipeline.shutdown_tx()));

    let result = pipeline.run().await;

    // The run is over, so a signal arriving now has nothing left to cancel.
    shutdown_handle.abort();

    Ok(result?)
}

/// Raises `shutdown_tx` on SIGINT or SIGTERM.
async fn listen_for_shutdown(shutdown_tx: ShutdownTx) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("sigint (ctrl+c) received, shutting down pipeline");
                    }
                    _ = sigterm.recv() => {
                        info!("sigterm received, shutting down pipeline");
                    }
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "failed to register sigterm handler, listening for ctrl+c only"
                );
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;

    shutdown_tx.shutdown();
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("sigint (ctrl+c) received, shutting down pipeline"),
        Err(err) => {
            // Without a signal handler the run can only end on its own.
            warn!(error = %err, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    }
}
