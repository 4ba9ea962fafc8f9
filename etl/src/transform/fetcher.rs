//! HTTP access used by the enrich transform.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use etl_config::shared::HttpConfig;
use serde_json::Value;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};

/// Asynchronous capability to fetch a JSON document by URL.
///
/// Enrichment performs network I/O through this trait rather than directly, so tests and
/// embedders can substitute their own implementation.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a GET request to `url` with `headers` and returns the decoded JSON body.
    async fn fetch_json(&self, url: &str, headers: &BTreeMap<String, String>) -> EtlResult<Value>;
}

/// [`Fetcher`] backed by a [`reqwest::Client`].
///
/// Responses with a non-success status are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default request timeout.
    pub fn new() -> EtlResult<Self> {
        Self::with_timeout(Duration::from_millis(HttpConfig::DEFAULT_TIMEOUT_MS))
    }

    /// Creates a fetcher whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> EtlResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client })
    }

    /// Creates a fetcher from the HTTP section of the runtime settings.
    pub fn from_config(config: &HttpConfig) -> EtlResult<Self> {
        Self::with_timeout(Duration::from_millis(config.timeout_ms))
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str, headers: &BTreeMap<String, String>) -> EtlResult<Value> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(url, "sending GET request");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            bail!(
                ErrorKind::HttpRequestFailed,
                "HTTP request returned an error status",
                format!("GET {url} returned {status}")
            );
        }

        Ok(response.json::<Value>().await?)
    }
}
