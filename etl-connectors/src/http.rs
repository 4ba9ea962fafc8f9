use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use etl::error::{ErrorKind, EtlResult};
use etl::path::{FieldPath, value_type_name};
use etl::source::Source;
use etl::types::Batch;
use etl::{bail, etl_error};
use etl_config::shared::{ComponentDescriptor, HttpConfig};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

const HEADERS_OPTION: &str = "headers";
const DATA_PATH_OPTION: &str = "dataPath";
const TIMEOUT_OPTION: &str = "timeoutMs";

/// Reads a batch from a JSON HTTP endpoint.
///
/// The client is created on connect and dropped on disconnect. The response must be a JSON array
/// or object; with a data path, the array is taken from that property of the response object.
#[derive(Debug)]
pub struct HttpSource {
    url: String,
    headers: BTreeMap<String, String>,
    data_path: Option<FieldPath>,
    timeout: Duration,
    client: Mutex<Option<reqwest::Client>>,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            data_path: None,
            timeout: Duration::from_millis(HttpConfig::DEFAULT_TIMEOUT_MS),
            client: Mutex::new(None),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_data_path(mut self, data_path: FieldPath) -> Self {
        self.data_path = Some(data_path);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the source from a descriptor whose `location` is the URL.
    ///
    /// Recognised options are `headers` (an object of strings), `dataPath` and `timeoutMs`.
    pub fn from_descriptor(descriptor: &ComponentDescriptor) -> EtlResult<Self> {
        let Some(url) = descriptor
            .location
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        else {
            bail!(
                ErrorKind::ConfigError,
                "Missing connector location",
                format!("`{}` requires a `location`", descriptor.component_type)
            );
        };

        let mut source = Self::new(url);

        if let Some(headers) = descriptor.option(HEADERS_OPTION) {
            let Some(headers) = headers.as_object() else {
                bail!(
                    ErrorKind::ConfigError,
                    "Invalid connector option",
                    "`headers` must be an object"
                );
            };

            for (name, value) in headers {
                let Some(value) = value.as_str() else {
                    bail!(
                        ErrorKind::ConfigError,
                        "Invalid connector option",
                        format!("header `{name}` must be a string")
                    );
                };
                source = source.with_header(name, value);
            }
        }

        if let Some(data_path) = descriptor.option_str(DATA_PATH_OPTION) {
            let data_path = FieldPath::parse(data_path)
                .map_err(|err| err.in_stage(ErrorKind::ConfigError, "Invalid connector option"))?;
            source = source.with_data_path(data_path);
        }

        if let Some(timeout) = descriptor.option(TIMEOUT_OPTION) {
            match timeout.as_u64() {
                Some(timeout_ms) if timeout_ms > 0 => {
                    source = source.with_timeout(Duration::from_millis(timeout_ms));
                }
                _ => bail!(
                    ErrorKind::ConfigError,
                    "Invalid connector option",
                    "`timeoutMs` must be a positive integer"
                ),
            }
        }

        Ok(source)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Extracts the batch from a response body.
fn response_to_batch(body: Value, data_path: Option<&FieldPath>) -> EtlResult<Batch> {
    let body = match data_path {
        Some(path) => match path.get(&body) {
            Some(nested) => nested.clone(),
            None => bail!(
                ErrorKind::SourceReadFailed,
                "HTTP response has no records at the data path",
                path.as_str()
            ),
        },
        None => body,
    };

    match body {
        Value::Array(records) => Ok(records),
        Value::Object(_) => Ok(vec![body]),
        other => bail!(
            ErrorKind::SourceReadFailed,
            "HTTP response does not hold records",
            format!("expected an array or object, received a {}", value_type_name(&other))
        ),
    }
}

#[async_trait]
impl Source for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    fn supports_connection(&self) -> bool {
        true
    }

    async fn connect(&self) -> EtlResult<()> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| {
                etl_error!(
                    ErrorKind::SourceConnectionFailed,
                    "HTTP client could not be created",
                    err.to_string(),
                    source: err
                )
            })?;

        *self.client.lock().await = Some(client);
        debug!(url = %self.url, "http source connected");

        Ok(())
    }

    async fn read(&self) -> EtlResult<Batch> {
        let Some(client) = self.client.lock().await.clone() else {
            bail!(
                ErrorKind::SourceReadFailed,
                "HTTP source is not connected",
                self.url.clone()
            );
        };

        let mut request = client.get(&self.url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            bail!(
                ErrorKind::SourceReadFailed,
                "HTTP source request failed",
                format!("GET {} returned {status}", self.url)
            );
        }

        let body: Value = response.json().await?;
        let records = response_to_batch(body, self.data_path.as_ref())?;
        info!(url = %self.url, records = records.len(), "fetched records");

        Ok(records)
    }

    async fn disconnect(&self) -> EtlResult<()> {
        self.client.lock().await.take();
        debug!(url = %self.url, "http source disconnected");

        Ok(())
    }
}
