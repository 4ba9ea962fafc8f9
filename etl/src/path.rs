//! Dotted field paths addressing nested record properties.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::bail;
use crate::error::{ErrorKind, EtlError, EtlResult};
use crate::types::Record;

/// Separator between the segments of a field path.
const PATH_SEPARATOR: char = '.';

/// A parsed field path such as `user.address.city`.
///
/// Reading a path whose intermediate properties are missing yields `None` rather than an error.
/// Writing a path creates missing intermediate objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dotted path.
    ///
    /// Fails with [`ErrorKind::InvalidTransformConfig`] when the path or any of its segments is
    /// empty.
    pub fn parse(path: &str) -> EtlResult<Self> {
        if path.is_empty() {
            bail!(
                ErrorKind::InvalidTransformConfig,
                "Field path cannot be empty"
            );
        }

        let segments: Vec<String> = path.split(PATH_SEPARATOR).map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            bail!(
                ErrorKind::InvalidTransformConfig,
                "Field path contains an empty segment",
                format!("path `{path}`")
            );
        }

        Ok(Self {
            raw: path.to_owned(),
            segments,
        })
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the individual segments of the path.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against `record`.
    pub fn get<'a>(&self, record: &'a Record) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(record, |current, segment| current.as_object()?.get(segment))
    }

    /// Writes `value` at the path, creating missing intermediate objects.
    ///
    /// Fails with [`ErrorKind::InvalidData`] when the record, or a value the path has to descend
    /// through, is not an object.
    pub fn set(&self, record: &mut Record, value: Value) -> EtlResult<()> {
        let (last, parents) = self.split_last();

        let mut current = record;
        for segment in parents {
            let object = self.as_object_mut(current, segment)?;
            current = object
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        self.as_object_mut(current, last)?
            .insert(last.clone(), value);

        Ok(())
    }

    fn split_last(&self) -> (&String, &[String]) {
        // `parse` guarantees at least one segment.
        match self.segments.split_last() {
            Some(split) => split,
            None => unreachable!("field paths always have at least one segment"),
        }
    }

    fn as_object_mut<'a>(
        &self,
        value: &'a mut Value,
        segment: &str,
    ) -> EtlResult<&'a mut Map<String, Value>> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(crate::etl_error!(
                ErrorKind::InvalidData,
                "Cannot write a field below a non-object value",
                format!(
                    "path `{}` reaches a {} before segment `{segment}`",
                    self.raw,
                    value_type_name(other)
                )
            )),
        }
    }
}

impl FromStr for FieldPath {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Returns a short name for the JSON type of `value`, used in error details.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
