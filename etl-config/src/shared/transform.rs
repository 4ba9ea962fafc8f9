use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::shared::ValidationError;

/// Declarative description of a built-in transformation step.
///
/// The `type` tag selects the variant; the remaining keys are the variant's fields in camelCase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformConfig {
    /// Moves values between field paths.
    FieldMapping(FieldMappingConfig),
    /// Keeps only records matching a predicate.
    Filter(FilterConfig),
    /// Rewrites fields in place with value operations.
    Map(MapConfig),
    /// Sets a field to a constant.
    AddField(AddFieldConfig),
    /// Merges or replaces records with the body of an HTTP call.
    Enrich(EnrichConfig),
    /// Applies nested transforms in sequence.
    Composite(CompositeConfig),
}

impl TransformConfig {
    /// Type tags of every built-in variant.
    pub const BUILTIN_TAGS: &'static [&'static str] = &[
        "FIELD_MAPPING",
        "FILTER",
        "MAP",
        "ADD_FIELD",
        "ENRICH",
        "COMPOSITE",
    ];

    /// Returns `true` when `tag` names a built-in variant.
    pub fn is_builtin_tag(tag: &str) -> bool {
        Self::BUILTIN_TAGS.contains(&tag)
    }

    /// Returns the `type` tag of this variant.
    pub fn type_tag(&self) -> &'static str {
        match self {
            TransformConfig::FieldMapping(_) => "FIELD_MAPPING",
            TransformConfig::Filter(_) => "FILTER",
            TransformConfig::Map(_) => "MAP",
            TransformConfig::AddField(_) => "ADD_FIELD",
            TransformConfig::Enrich(_) => "ENRICH",
            TransformConfig::Composite(_) => "COMPOSITE",
        }
    }

    /// Validates the variant's fields, recursing into composite members.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TransformConfig::FieldMapping(_) => Ok(()),
            TransformConfig::Filter(config) => config.validate(),
            TransformConfig::Map(config) => config.validate(),
            TransformConfig::AddField(config) => {
                if config.field.is_empty() {
                    return Err(ValidationError::EmptyField {
                        transform: "ADD_FIELD",
                        field: "field",
                    });
                }
                Ok(())
            }
            TransformConfig::Enrich(config) => config.validate(),
            TransformConfig::Composite(config) => {
                config.transforms.iter().try_for_each(TransformConfig::validate)
            }
        }
    }
}

/// Copies values from source paths to target paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingConfig {
    /// Source path to target path.
    pub field_map: BTreeMap<String, String>,
    /// When `true`, fields that are not mapped source keys are dropped.
    #[serde(default)]
    pub drop_unmapped: bool,
}

/// Comparison operators understood by [`FilterConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanEquals,
    LessThanEquals,
    In,
    NotIn,
    /// Matches when the field holds the boolean `true`.
    Exists,
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterOperator {
    /// Returns the configuration name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "EQUALS",
            FilterOperator::NotEquals => "NOT_EQUALS",
            FilterOperator::GreaterThan => "GREATER_THAN",
            FilterOperator::LessThan => "LESS_THAN",
            FilterOperator::GreaterThanEquals => "GREATER_THAN_EQUALS",
            FilterOperator::LessThanEquals => "LESS_THAN_EQUALS",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT_IN",
            FilterOperator::Exists => "EXISTS",
            FilterOperator::Contains => "CONTAINS",
            FilterOperator::StartsWith => "STARTS_WITH",
            FilterOperator::EndsWith => "ENDS_WITH",
        }
    }
}

/// Keeps records whose `field` satisfies `operator` against `value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub field: String,
    pub operator: FilterOperator,
    /// Operand; an array for `IN`/`NOT_IN`, ignored by `EXISTS`.
    #[serde(default)]
    pub value: Value,
}

impl FilterConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.field.is_empty() {
            return Err(ValidationError::EmptyField {
                transform: "FILTER",
                field: "field",
            });
        }

        if matches!(self.operator, FilterOperator::In | FilterOperator::NotIn)
            && !self.value.is_array()
        {
            return Err(ValidationError::MembershipValueNotArray {
                operator: self.operator.as_str(),
            });
        }

        Ok(())
    }
}

/// Value operations understood by [`MapConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MapOperation {
    ToUpperCase,
    ToLowerCase,
    Trim,
    Number,
    String,
    Boolean,
    ParseJson,
    StringifyJson,
}

/// One in-place rewrite of a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapStep {
    pub field: String,
    pub operation: MapOperation,
}

/// Ordered list of in-place field rewrites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub operations: Vec<MapStep>,
}

impl MapConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.operations.iter().any(|step| step.field.is_empty()) {
            return Err(ValidationError::EmptyField {
                transform: "MAP",
                field: "operations[].field",
            });
        }

        Ok(())
    }
}

/// Sets `field` to the constant `value` on every record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddFieldConfig {
    pub field: String,
    pub value: Value,
}

/// Batch-level policy applied when an enrichment call fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichErrorPolicy {
    /// Return the batch unmodified.
    Skip,
    /// Merge the configured fallback record into every record of the batch.
    Fallback,
}

/// Calls an HTTP endpoint per record and merges or replaces the record with the response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichConfig {
    /// URL with `{{field}}` placeholders filled from top-level record fields.
    pub url_template: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Merge the response into the record instead of replacing it.
    #[serde(default)]
    pub merge: bool,
    /// Failure policy; errors propagate when unset.
    #[serde(default)]
    pub on_error: Option<EnrichErrorPolicy>,
    #[serde(default)]
    pub fallback: Option<Map<String, Value>>,
}

impl EnrichConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.url_template.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                transform: "ENRICH",
                field: "urlTemplate",
            });
        }

        if self.on_error == Some(EnrichErrorPolicy::Fallback) && self.fallback.is_none() {
            return Err(ValidationError::MissingFallback);
        }

        Ok(())
    }
}

/// Nested transforms applied in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    pub transforms: Vec<TransformConfig>,
}
