use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use etl_config::shared::{EnrichConfig, EnrichErrorPolicy};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::conversions::string::to_display_string;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::path::value_type_name;
use crate::transform::Transform;
use crate::transform::fetcher::Fetcher;
use crate::types::{Batch, Record};
use crate::{bail, etl_error};

const PLACEHOLDER_OPEN: &str = "{{";
const PLACEHOLDER_CLOSE: &str = "}}";

/// What happens to a batch when enriching any of its records fails.
#[derive(Debug, Clone)]
enum FailurePolicy {
    Propagate,
    Skip,
    Fallback(Map<String, Value>),
}

/// Enriches records with the JSON body returned by an HTTP endpoint.
///
/// Requests are issued one record at a time, in batch order. The failure policy applies to the
/// whole batch: one failed call either aborts it, returns it unmodified or merges the fallback
/// record into every record of it.
pub struct EnrichTransform {
    url_template: String,
    headers: BTreeMap<String, String>,
    merge: bool,
    policy: FailurePolicy,
    fetcher: Arc<dyn Fetcher>,
}

impl EnrichTransform {
    pub fn new(config: &EnrichConfig, fetcher: Arc<dyn Fetcher>) -> EtlResult<Self> {
        let policy = match (config.on_error, &config.fallback) {
            (None, _) => FailurePolicy::Propagate,
            (Some(EnrichErrorPolicy::Skip), _) => FailurePolicy::Skip,
            (Some(EnrichErrorPolicy::Fallback), Some(fallback)) => {
                FailurePolicy::Fallback(fallback.clone())
            }
            (Some(EnrichErrorPolicy::Fallback), None) => {
                bail!(
                    ErrorKind::InvalidTransformConfig,
                    "Enrich fallback policy requires a fallback record"
                );
            }
        };

        Ok(Self {
            url_template: config.url_template.clone(),
            headers: config.headers.clone(),
            merge: config.merge,
            policy,
            fetcher,
        })
    }

    async fn enrich_record(&self, record: Record) -> EtlResult<Record> {
        let url = interpolate(&self.url_template, &record);

        let response = self
            .fetcher
            .fetch_json(&url, &self.headers)
            .await
            .map_err(|err| {
                etl_error!(
                    ErrorKind::EnrichmentFailed,
                    "Enrichment request failed",
                    format!("GET {url}"),
                    source: err
                )
            })?;

        if !self.merge {
            return Ok(response);
        }

        merge_response(record, response)
    }

    async fn enrich_batch(&self, records: &[Record]) -> EtlResult<Batch> {
        let mut enriched = Vec::with_capacity(records.len());
        for record in records {
            enriched.push(self.enrich_record(record.clone()).await?);
        }

        Ok(enriched)
    }

    fn recover(&self, records: Batch, err: EtlError) -> EtlResult<Batch> {
        match &self.policy {
            FailurePolicy::Propagate => Err(err),
            FailurePolicy::Skip => {
                warn!(
                    error = %err,
                    records = records.len(),
                    "enrichment failed, keeping batch unmodified"
                );
                Ok(records)
            }
            FailurePolicy::Fallback(fallback) => {
                warn!(
                    error = %err,
                    records = records.len(),
                    "enrichment failed, applying fallback to batch"
                );
                Ok(records
                    .into_iter()
                    .map(|record| merge_fallback(record, fallback))
                    .collect())
            }
        }
    }
}

impl fmt::Debug for EnrichTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichTransform")
            .field("url_template", &self.url_template)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("merge", &self.merge)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transform for EnrichTransform {
    fn name(&self) -> &str {
        "ENRICH"
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        let mut output = self.transform_many(vec![record]).await?;
        match output.pop() {
            Some(record) => Ok(record),
            None => bail!(
                ErrorKind::EnrichmentFailed,
                "Enrichment produced no record"
            ),
        }
    }

    async fn transform_many(&self, records: Batch) -> EtlResult<Batch> {
        if records.is_empty() {
            return Ok(records);
        }

        debug!(records = records.len(), "enriching batch");

        match self.enrich_batch(&records).await {
            Ok(enriched) => Ok(enriched),
            Err(err) => self.recover(records, err),
        }
    }
}

/// Replaces every `{{key}}` in `template` with the top-level field `key` of `record`.
///
/// Missing fields are replaced with an empty string; an unterminated placeholder is kept as is.
fn interpolate(template: &str, record: &Record) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(PLACEHOLDER_OPEN) {
        let after_open = &rest[start + PLACEHOLDER_OPEN.len()..];
        let Some(end) = after_open.find(PLACEHOLDER_CLOSE) else {
            break;
        };

        output.push_str(&rest[..start]);

        let key = after_open[..end].trim();
        if let Some(value) = record.get(key) {
            output.push_str(&to_display_string(value));
        }

        rest = &after_open[end + PLACEHOLDER_CLOSE.len()..];
    }

    output.push_str(rest);
    output
}

/// Shallow merge; keys of the response override keys of the record.
fn merge_response(record: Record, response: Value) -> EtlResult<Record> {
    match (record, response) {
        (Value::Object(mut fields), Value::Object(response)) => {
            fields.extend(response);
            Ok(Value::Object(fields))
        }
        (_, Value::Object(response)) => Ok(Value::Object(response)),
        (_, other) => Err(etl_error!(
            ErrorKind::InvalidData,
            "Enrichment response cannot be merged into a record",
            format!("expected an object, received a {}", value_type_name(&other))
        )),
    }
}

fn merge_fallback(record: Record, fallback: &Map<String, Value>) -> Record {
    match record {
        Value::Object(mut fields) => {
            fields.extend(fallback.clone());
            Value::Object(fields)
        }
        _ => Value::Object(fallback.clone()),
    }
}
