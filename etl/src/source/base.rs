use async_trait::async_trait;

use crate::error::EtlResult;
use crate::types::Batch;

/// Trait for components that produce records for a pipeline.
///
/// Only [`Source::read`] is required. Sources holding external resources override
/// [`Source::supports_connection`] together with [`Source::connect`] and [`Source::disconnect`];
/// the pipeline skips the connection phases for sources that do not.
///
/// Methods take `&self`, so sources keep mutable state behind interior mutability.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the name of the source, used in logs.
    fn name(&self) -> &str;

    /// Returns `true` when the source must be connected before reading and disconnected after.
    fn supports_connection(&self) -> bool {
        false
    }

    /// Acquires the resources needed to read.
    async fn connect(&self) -> EtlResult<()> {
        Ok(())
    }

    /// Reads the full batch of records.
    async fn read(&self) -> EtlResult<Batch>;

    /// Releases resources acquired by [`Source::connect`].
    ///
    /// Called once after every run that reached the source, whether or not earlier steps failed.
    async fn disconnect(&self) -> EtlResult<()> {
        Ok(())
    }
}
