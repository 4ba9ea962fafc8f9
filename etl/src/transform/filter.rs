use std::cmp::Ordering;

use async_trait::async_trait;
use etl_config::shared::{FilterConfig, FilterOperator};
use serde_json::Value;

use crate::conversions::numeric::to_f64;
use crate::conversions::string::to_display_string;
use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::path::FieldPath;
use crate::transform::Transform;
use crate::types::{Batch, Record};

/// Keeps records whose field satisfies a predicate.
///
/// In batch mode non-matching records are left out. A single non-matching record is reported as
/// an [`ErrorKind::FilterRejected`] error.
#[derive(Debug, Clone)]
pub struct FilterTransform {
    path: FieldPath,
    operator: FilterOperator,
    value: Value,
}

impl FilterTransform {
    pub fn new(config: &FilterConfig) -> EtlResult<Self> {
        Ok(Self {
            path: FieldPath::parse(&config.field)?,
            operator: config.operator,
            value: config.value.clone(),
        })
    }

    /// Returns `true` when `record` passes the filter.
    pub fn matches(&self, record: &Record) -> bool {
        evaluate_filter(self.operator, self.path.get(record), &self.value)
    }
}

#[async_trait]
impl Transform for FilterTransform {
    fn name(&self) -> &str {
        "FILTER"
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        if self.matches(&record) {
            return Ok(record);
        }

        Err(etl_error!(
            ErrorKind::FilterRejected,
            "Record rejected by filter",
            format!(
                "`{}` {} {}",
                self.path,
                self.operator.as_str(),
                self.value
            )
        ))
    }

    async fn transform_many(&self, records: Batch) -> EtlResult<Batch> {
        Ok(records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect())
    }
}

/// Evaluates `operator` for a field value against the configured operand.
///
/// `field` is `None` when the path does not resolve. An absent field only satisfies the negated
/// operators `NOT_EQUALS` and `NOT_IN`.
///
/// `EXISTS` matches only when the field holds the boolean `true`, not whenever it is present.
pub fn evaluate_filter(operator: FilterOperator, field: Option<&Value>, operand: &Value) -> bool {
    match operator {
        FilterOperator::Equals => field.is_some_and(|field| strict_equals(field, operand)),
        FilterOperator::NotEquals => !field.is_some_and(|field| strict_equals(field, operand)),
        FilterOperator::GreaterThan => compare(field, operand) == Some(Ordering::Greater),
        FilterOperator::LessThan => compare(field, operand) == Some(Ordering::Less),
        FilterOperator::GreaterThanEquals => matches!(
            compare(field, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::LessThanEquals => matches!(
            compare(field, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::In => is_member(field, operand),
        FilterOperator::NotIn => !is_member(field, operand),
        FilterOperator::Exists => matches!(field, Some(Value::Bool(true))),
        FilterOperator::Contains => {
            string_test(field, operand, |field, operand| field.contains(operand))
        }
        FilterOperator::StartsWith => {
            string_test(field, operand, |field, operand| field.starts_with(operand))
        }
        FilterOperator::EndsWith => {
            string_test(field, operand, |field, operand| field.ends_with(operand))
        }
    }
}

/// Equality without type coercion; numbers compare by value so `1` equals `1.0`.
fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

/// Orders two values: numbers numerically, strings lexicographically and a number against a
/// string numerically. Any other pairing, or a NaN, is unordered.
fn compare(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (field?, operand) {
        (Value::String(left), Value::String(right)) => Some(left.cmp(right)),
        (
            left @ (Value::Number(_) | Value::String(_)),
            right @ (Value::Number(_) | Value::String(_)),
        ) => to_f64(left).partial_cmp(&to_f64(right)),
        _ => None,
    }
}

fn is_member(field: Option<&Value>, operand: &Value) -> bool {
    let (Some(field), Some(items)) = (field, operand.as_array()) else {
        return false;
    };

    items.iter().any(|item| strict_equals(field, item))
}

fn string_test(field: Option<&Value>, operand: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    field.is_some_and(|field| test(&to_display_string(field), &to_display_string(operand)))
}
