use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::sink::Sink;
use crate::types::Batch;

#[derive(Debug, Default)]
struct Inner {
    records: Batch,
    connect_calls: usize,
    write_calls: usize,
    disconnect_calls: usize,
    fail_connect: bool,
    fail_write: bool,
    fail_disconnect: bool,
}

/// In-memory sink for tests and development.
///
/// Written batches are appended to an in-memory buffer that can be inspected through any clone
/// of the sink.
#[derive(Debug, Clone)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Returns a copy of every record written so far.
    pub async fn records(&self) -> Batch {
        self.inner.lock().await.records.clone()
    }

    /// Clears the written records.
    pub async fn clear(&self) {
        self.inner.lock().await.records.clear();
    }

    /// Makes every subsequent [`Sink::connect`] fail.
    pub async fn fail_connect(&self) {
        self.inner.lock().await.fail_connect = true;
    }

    /// Makes every subsequent [`Sink::write`] fail.
    pub async fn fail_write(&self) {
        self.inner.lock().await.fail_write = true;
    }

    /// Makes every subsequent [`Sink::disconnect`] fail.
    pub async fn fail_disconnect(&self) {
        self.inner.lock().await.fail_disconnect = true;
    }

    pub async fn connect_calls(&self) -> usize {
        self.inner.lock().await.connect_calls
    }

    pub async fn write_calls(&self) -> usize {
        self.inner.lock().await.write_calls
    }

    pub async fn disconnect_calls(&self) -> usize {
        self.inner.lock().await.disconnect_calls
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn supports_connection(&self) -> bool {
        true
    }

    async fn connect(&self) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.connect_calls += 1;

        if inner.fail_connect {
            bail!(
                ErrorKind::SinkConnectionFailed,
                "Memory sink connection failed"
            );
        }

        Ok(())
    }

    async fn write(&self, records: Batch) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.write_calls += 1;

        if inner.fail_write {
            bail!(ErrorKind::SinkWriteFailed, "Memory sink write failed");
        }

        info!("writing a batch of {} records:", records.len());

        for record in &records {
            info!("  {}", record);
        }
        inner.records.extend(records);

        Ok(())
    }

    async fn disconnect(&self) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.disconnect_calls += 1;

        if inner.fail_disconnect {
            bail!(
                ErrorKind::SinkDisconnectFailed,
                "Memory sink disconnection failed"
            );
        }

        Ok(())
    }
}
