use async_trait::async_trait;
use etl::error::EtlResult;
use etl::sink::Sink;
use etl::types::Batch;
use etl_config::shared::ComponentDescriptor;
use tracing::info;

/// Label used when the descriptor sets none.
const DEFAULT_LABEL: &str = "log";

/// Sink that logs every record at `info` and keeps nothing.
#[derive(Debug, Clone)]
pub struct LogSink {
    label: String,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Builds the sink from a descriptor; `location` labels the log lines.
    pub fn from_descriptor(descriptor: &ComponentDescriptor) -> Self {
        Self::new(descriptor.location.as_deref().unwrap_or(DEFAULT_LABEL))
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Sink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn write(&self, records: Batch) -> EtlResult<()> {
        info!(sink = %self.label, records = records.len(), "writing batch");

        for record in &records {
            info!(sink = %self.label, %record, "record");
        }

        Ok(())
    }
}
