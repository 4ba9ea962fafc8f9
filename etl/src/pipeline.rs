//! Single-use pipeline controller.
//!
//! A [`Pipeline`] owns one source, one [`TransformChain`] and one sink and runs them once:
//! connect, read, transform, write, then disconnect. Disconnection is attempted on every exit
//! path, and its failures are logged without replacing the outcome of the run.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use crate::bail;
use crate::concurrency::shutdown::{
    ShutdownRx, ShutdownTx, create_shutdown_channel, is_shutdown_requested,
};
use crate::error::{ErrorKind, EtlResult};
use crate::sink::Sink;
use crate::source::Source;
use crate::transform::TransformChain;
use crate::types::Batch;

/// Name used in logs for pipelines built without one.
const DEFAULT_PIPELINE_NAME: &str = "pipeline";

/// Lifecycle of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Connecting,
    Reading,
    Transforming,
    Writing,
    Disconnecting,
    Completed,
    Failed,
}

impl PipelineState {
    /// Returns `true` for [`PipelineState::Completed`] and [`PipelineState::Failed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Created => "created",
            PipelineState::Connecting => "connecting",
            PipelineState::Reading => "reading",
            PipelineState::Transforming => "transforming",
            PipelineState::Writing => "writing",
            PipelineState::Disconnecting => "disconnecting",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };

        f.write_str(name)
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    /// Records produced by the source.
    pub records_read: usize,
    /// Records handed to the sink.
    pub records_written: usize,
    /// Wall-clock duration of the run, disconnection included.
    pub elapsed: Duration,
}

/// Runs one source, transform chain and sink exactly once.
pub struct Pipeline {
    name: String,
    source: Box<dyn Source>,
    chain: TransformChain,
    sink: Box<dyn Sink>,
    state: PipelineState,
    shutdown_tx: ShutdownTx,
}

impl Pipeline {
    pub fn new(source: Box<dyn Source>, chain: TransformChain, sink: Box<dyn Sink>) -> Self {
        // The initial receiver is dropped; `run` subscribes its own.
        let (shutdown_tx, _) = create_shutdown_channel();

        Self {
            name: DEFAULT_PIPELINE_NAME.to_owned(),
            source,
            chain,
            sink,
            state: PipelineState::Created,
            shutdown_tx,
        }
    }

    /// Sets the name used in logs and returns the pipeline.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    /// Returns a handle that cancels the run at its next stage boundary.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Runs the pipeline.
    ///
    /// The source and sink are disconnected after the run whatever its outcome, source first.
    /// Errors from connecting, reading, transforming or writing are returned after that step,
    /// classified by the stage they occurred in. A pipeline runs at most once; later calls fail
    /// with [`ErrorKind::InvalidState`].
    pub async fn run(&mut self) -> EtlResult<PipelineReport> {
        if self.state != PipelineState::Created {
            bail!(
                ErrorKind::InvalidState,
                "Pipeline can only be run once",
                format!("pipeline `{}` is {}", self.name, self.state)
            );
        }

        info!(
            pipeline = %self.name,
            source = self.source.name(),
            sink = self.sink.name(),
            transforms = self.chain.len(),
            "starting pipeline"
        );

        let started = Instant::now();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let result = self.execute(&shutdown_rx).await;

        self.disconnect().await;

        match result {
            Ok((records_read, records_written)) => {
                self.transition(PipelineState::Completed);

                let report = PipelineReport {
                    records_read,
                    records_written,
                    elapsed: started.elapsed(),
                };
                info!(
                    pipeline = %self.name,
                    records_read,
                    records_written,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "pipeline completed"
                );

                Ok(report)
            }
            Err(err) => {
                self.transition(PipelineState::Failed);
                error!(pipeline = %self.name, error = %err, "pipeline failed");

                Err(err)
            }
        }
    }

    async fn execute(&mut self, shutdown_rx: &ShutdownRx) -> EtlResult<(usize, usize)> {
        if self.needs_connection() {
            check_shutdown(shutdown_rx, "connect")?;
            self.transition(PipelineState::Connecting);

            if self.source.supports_connection() {
                self.source.connect().await.map_err(|err| {
                    err.in_stage(ErrorKind::SourceConnectionFailed, "Source connection failed")
                })?;
            }
            if self.sink.supports_connection() {
                self.sink.connect().await.map_err(|err| {
                    err.in_stage(ErrorKind::SinkConnectionFailed, "Sink connection failed")
                })?;
            }
        }

        check_shutdown(shutdown_rx, "read")?;
        self.transition(PipelineState::Reading);
        let records = self
            .source
            .read()
            .await
            .map_err(|err| err.in_stage(ErrorKind::SourceReadFailed, "Source read failed"))?;
        let records_read = records.len();
        debug!(pipeline = %self.name, records = records_read, "read batch");

        self.transition(PipelineState::Transforming);
        let records = self.transform(records, shutdown_rx).await?;

        check_shutdown(shutdown_rx, "write")?;
        self.transition(PipelineState::Writing);
        let records_written = records.len();
        self.sink
            .write(records)
            .await
            .map_err(|err| err.in_stage(ErrorKind::SinkWriteFailed, "Sink write failed"))?;

        Ok((records_read, records_written))
    }

    /// Folds the batch through every stage of the chain, checking for shutdown between stages.
    async fn transform(&self, records: Batch, shutdown_rx: &ShutdownRx) -> EtlResult<Batch> {
        let mut records = records;
        for stage in self.chain.stages() {
            check_shutdown(shutdown_rx, stage.name())?;

            if records.is_empty() {
                break;
            }

            let before = records.len();
            records = stage
                .transform_many(records)
                .await
                .map_err(|err| err.in_stage(ErrorKind::TransformFailed, "Transform failed"))?;
            debug!(
                pipeline = %self.name,
                stage = stage.name(),
                records_in = before,
                records_out = records.len(),
                "applied transform"
            );
        }

        Ok(records)
    }

    /// Disconnects the source and then the sink, logging failures.
    async fn disconnect(&mut self) {
        if !self.needs_connection() {
            return;
        }

        self.transition(PipelineState::Disconnecting);

        if self.source.supports_connection()
            && let Err(err) = self.source.disconnect().await
        {
            error!(
                pipeline = %self.name,
                source = self.source.name(),
                error = %err,
                "failed to disconnect source"
            );
        }

        if self.sink.supports_connection()
            && let Err(err) = self.sink.disconnect().await
        {
            error!(
                pipeline = %self.name,
                sink = self.sink.name(),
                error = %err,
                "failed to disconnect sink"
            );
        }
    }

    fn needs_connection(&self) -> bool {
        self.source.supports_connection() || self.sink.supports_connection()
    }

    fn transition(&mut self, state: PipelineState) {
        debug!(pipeline = %self.name, from = %self.state, to = %state, "pipeline state changed");
        self.state = state;
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("chain", &self.chain)
            .field("sink", &self.sink.name())
            .field("state", &self.state)
            .finish()
    }
}

fn check_shutdown(shutdown_rx: &ShutdownRx, stage: &str) -> EtlResult<()> {
    if is_shutdown_requested(shutdown_rx) {
        bail!(
            ErrorKind::PipelineCancelled,
            "Pipeline was cancelled",
            format!("shutdown requested before {stage}")
        );
    }

    Ok(())
}
