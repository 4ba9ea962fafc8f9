use async_trait::async_trait;
use etl_config::shared::{MapConfig, MapOperation};
use serde_json::Value;
use tracing::debug;

use crate::conversions::bool::to_bool;
use crate::conversions::numeric::to_number;
use crate::conversions::string::to_display_string;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::path::{FieldPath, value_type_name};
use crate::transform::Transform;
use crate::types::Record;

/// Rewrites fields in place with an ordered list of value operations.
///
/// Operations on a field that is absent from the record are skipped.
#[derive(Debug, Clone)]
pub struct MapTransform {
    steps: Vec<(FieldPath, MapOperation)>,
}

impl MapTransform {
    pub fn new(config: &MapConfig) -> EtlResult<Self> {
        let steps = config
            .operations
            .iter()
            .map(|step| Ok((FieldPath::parse(&step.field)?, step.operation)))
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(Self { steps })
    }
}

#[async_trait]
impl Transform for MapTransform {
    fn name(&self) -> &str {
        "MAP"
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        let mut record = record;
        for (path, operation) in &self.steps {
            let Some(current) = path.get(&record) else {
                continue;
            };

            if let Some(updated) = apply_operation(*operation, path, current)? {
                path.set(&mut record, updated)?;
            }
        }

        Ok(record)
    }
}

/// Computes the new value of a field, or `None` when the field stays unchanged.
fn apply_operation(
    operation: MapOperation,
    path: &FieldPath,
    current: &Value,
) -> EtlResult<Option<Value>> {
    let updated = match operation {
        MapOperation::ToUpperCase => {
            Value::String(expect_string(operation, path, current)?.to_uppercase())
        }
        MapOperation::ToLowerCase => {
            Value::String(expect_string(operation, path, current)?.to_lowercase())
        }
        MapOperation::Trim => {
            Value::String(expect_string(operation, path, current)?.trim().to_owned())
        }
        MapOperation::Number => to_number(current),
        MapOperation::String => Value::String(to_display_string(current)),
        MapOperation::Boolean => Value::Bool(to_bool(current)),
        MapOperation::ParseJson => {
            let Value::String(text) = current else {
                return Ok(None);
            };

            match serde_json::from_str(text) {
                Ok(parsed) => parsed,
                Err(err) => {
                    debug!(field = %path, error = %err, "leaving field unparsed");
                    return Ok(None);
                }
            }
        }
        MapOperation::StringifyJson => {
            let text = serde_json::to_string(current).map_err(|err| {
                etl_error!(
                    ErrorKind::SerializationError,
                    "Field could not be serialized",
                    format!("`{path}`: {err}"),
                    source: err
                )
            })?;
            Value::String(text)
        }
    };

    Ok(Some(updated))
}

fn expect_string<'a>(
    operation: MapOperation,
    path: &FieldPath,
    value: &'a Value,
) -> EtlResult<&'a str> {
    match value {
        Value::String(value) => Ok(value),
        other => Err(etl_error!(
            ErrorKind::InvalidData,
            "Map operation requires a string field",
            format!(
                "{operation:?} on `{path}` found a {}",
                value_type_name(other)
            )
        )),
    }
}
