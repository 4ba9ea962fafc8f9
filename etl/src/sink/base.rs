use async_trait::async_trait;

use crate::error::EtlResult;
use crate::types::Batch;

/// Trait for components that receive the output of a pipeline.
///
/// Only [`Sink::write`] is required. Connection handling mirrors [`crate::source::Source`].
#[async_trait]
pub trait Sink: Send + Sync {
    /// Returns the name of the sink, used in logs.
    fn name(&self) -> &str;

    /// Returns `true` when the sink must be connected before writing and disconnected after.
    fn supports_connection(&self) -> bool {
        false
    }

    /// Acquires the resources needed to write.
    async fn connect(&self) -> EtlResult<()> {
        Ok(())
    }

    /// Writes the full transformed batch.
    ///
    /// Called exactly once per successful run, also when the batch is empty.
    async fn write(&self, records: Batch) -> EtlResult<()>;

    /// Releases resources acquired by [`Sink::connect`].
    async fn disconnect(&self) -> EtlResult<()> {
        Ok(())
    }
}
