use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::source::Source;
use crate::types::{Batch, Record};

#[derive(Debug, Default)]
struct Inner {
    records: Batch,
    connect_calls: usize,
    read_calls: usize,
    disconnect_calls: usize,
    fail_connect: bool,
    fail_read: bool,
    fail_disconnect: bool,
}

/// In-memory source for tests and development.
///
/// Every read returns a copy of the configured records. The source counts calls to each
/// lifecycle method and can be told to fail any of them. Clones share state, so a clone kept by
/// a test observes the calls made on the one handed to a pipeline.
#[derive(Debug, Clone)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySource {
    /// Creates a source yielding `records`.
    pub fn new(records: Vec<Record>) -> Self {
        let inner = Inner {
            records,
            ..Inner::default()
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Makes every subsequent [`Source::connect`] fail.
    pub async fn fail_connect(&self) {
        self.inner.lock().await.fail_connect = true;
    }

    /// Makes every subsequent [`Source::read`] fail.
    pub async fn fail_read(&self) {
        self.inner.lock().await.fail_read = true;
    }

    /// Makes every subsequent [`Source::disconnect`] fail.
    pub async fn fail_disconnect(&self) {
        self.inner.lock().await.fail_disconnect = true;
    }

    /// Returns how many times [`Source::connect`] was called.
    pub async fn connect_calls(&self) -> usize {
        self.inner.lock().await.connect_calls
    }

    /// Returns how many times [`Source::read`] was called.
    pub async fn read_calls(&self) -> usize {
        self.inner.lock().await.read_calls
    }

    /// Returns how many times [`Source::disconnect`] was called.
    pub async fn disconnect_calls(&self) -> usize {
        self.inner.lock().await.disconnect_calls
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Source for MemorySource {
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
                ErrorKind::SourceConnectionFailed,
                "Memory source connection failed"
            );
        }

        Ok(())
    }

    async fn read(&self) -> EtlResult<Batch> {
        let mut inner = self.inner.lock().await;
        inner.read_calls += 1;

        if inner.fail_read {
            bail!(ErrorKind::SourceReadFailed, "Memory source read failed");
        }

        info!("reading {} records from memory source", inner.records.len());

        Ok(inner.records.clone())
    }

    async fn disconnect(&self) -> EtlResult<()> {
        let mut inner = self.inner.lock().await;
        inner.disconnect_calls += 1;

        if inner.fail_disconnect {
            bail!(
                ErrorKind::SourceDisconnectFailed,
                "Memory source disconnection failed"
            );
        }

        Ok(())
    }
}
