use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use etl::error::{ErrorKind, EtlResult};
use etl::path::value_type_name;
use etl::sink::Sink;
use etl::source::Source;
use etl::types::Batch;
use etl::{bail, etl_error};
use etl_config::shared::ComponentDescriptor;
use serde_json::Value;
use tracing::{debug, info};

/// Option enabling append mode on [`JsonFileSink`].
const APPEND_OPTION: &str = "append";

fn required_location(descriptor: &ComponentDescriptor) -> EtlResult<PathBuf> {
    match descriptor.location.as_deref() {
        Some(location) if !location.trim().is_empty() => Ok(PathBuf::from(location)),
        _ => bail!(
            ErrorKind::ConfigError,
            "Missing connector location",
            format!("`{}` requires a `location`", descriptor.component_type)
        ),
    }
}

/// Turns a parsed document into a batch.
///
/// Arrays are read element by element and a single object becomes a one-record batch.
fn document_to_batch(document: Value, path: &Path) -> EtlResult<Batch> {
    match document {
        Value::Array(records) => Ok(records),
        Value::Object(_) => Ok(vec![document]),
        other => bail!(
            ErrorKind::SourceReadFailed,
            "JSON file does not hold records",
            format!(
                "{} holds a {} instead of an array or object",
                path.display(),
                value_type_name(&other)
            )
        ),
    }
}

/// Reads a batch from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Builds the source from a descriptor whose `location` is the file path.
    pub fn from_descriptor(descriptor: &ComponentDescriptor) -> EtlResult<Self> {
        Ok(Self::new(required_location(descriptor)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Source for JsonFileSource {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn read(&self) -> EtlResult<Batch> {
        let contents = tokio::fs::read(&self.path).await.map_err(|err| {
            etl_error!(
                ErrorKind::SourceReadFailed,
                "JSON file could not be read",
                format!("{}: {err}", self.path.display()),
                source: err
            )
        })?;

        let document: Value = serde_json::from_slice(&contents).map_err(|err| {
            etl_error!(
                ErrorKind::SourceReadFailed,
                "JSON file could not be parsed",
                format!("{}: {err}", self.path.display()),
                source: err
            )
        })?;

        let records = document_to_batch(document, &self.path)?;
        debug!(path = %self.path.display(), records = records.len(), "read json file");

        Ok(records)
    }
}

/// Writes a batch to a JSON file as a pretty-printed array.
///
/// Parent directories are created as needed. In append mode the batch is added to the array
/// already stored in the file; otherwise the file is replaced.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
    append: bool,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append: false,
        }
    }

    /// Enables or disables append mode.
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Builds the sink from a descriptor whose `location` is the file path.
    ///
    /// `options.append: true` enables append mode.
    pub fn from_descriptor(descriptor: &ComponentDescriptor) -> EtlResult<Self> {
        let append = descriptor.option_bool(APPEND_OPTION).unwrap_or(false);

        Ok(Self::new(required_location(descriptor)?).with_append(append))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn existing_records(&self) -> EtlResult<Batch> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(etl_error!(
                    ErrorKind::SinkWriteFailed,
                    "Existing JSON file could not be read",
                    format!("{}: {err}", self.path.display()),
                    source: err
                ));
            }
        };

        match serde_json::from_slice(&contents) {
            Ok(Value::Array(records)) => Ok(records),
            Ok(_) => bail!(
                ErrorKind::SinkWriteFailed,
                "Existing JSON file is not an array",
                self.path.display()
            ),
            Err(err) => Err(etl_error!(
                ErrorKind::SinkWriteFailed,
                "Existing JSON file could not be parsed",
                format!("{}: {err}", self.path.display()),
                source: err
            )),
        }
    }
}

#[async_trait]
impl Sink for JsonFileSink {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn write(&self, records: Batch) -> EtlResult<()> {
        let written = records.len();
        let records = if self.append {
            let mut existing = self.existing_records().await?;
            existing.extend(records);
            existing
        } else {
            records
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                etl_error!(
                    ErrorKind::SinkWriteFailed,
                    "Output directory could not be created",
                    format!("{}: {err}", parent.display()),
                    source: err
                )
            })?;
        }

        let contents = serde_json::to_vec_pretty(&records).map_err(|err| {
            etl_error!(
                ErrorKind::SinkWriteFailed,
                "Records could not be serialized",
                err.to_string(),
                source: err
            )
        })?;

        tokio::fs::write(&self.path, contents).await.map_err(|err| {
            etl_error!(
                ErrorKind::SinkWriteFailed,
                "JSON file could not be written",
                format!("{}: {err}", self.path.display()),
                source: err
            )
        })?;

        info!(
            path = %self.path.display(),
            records = written,
            total = records.len(),
            "wrote json file"
        );

        Ok(())
    }
}
