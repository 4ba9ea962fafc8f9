use async_trait::async_trait;
use etl_config::shared::AddFieldConfig;
use serde_json::Value;

use crate::error::EtlResult;
use crate::path::FieldPath;
use crate::transform::Transform;
use crate::types::Record;

/// Sets a field to the same constant on every record.
///
/// Each record receives its own copy of the constant. Writing into a record that is not an
/// object fails with [`crate::error::ErrorKind::InvalidData`].
#[derive(Debug, Clone)]
pub struct AddFieldTransform {
    path: FieldPath,
    value: Value,
}

impl AddFieldTransform {
    pub fn new(config: &AddFieldConfig) -> EtlResult<Self> {
        Ok(Self {
            path: FieldPath::parse(&config.field)?,
            value: config.value.clone(),
        })
    }
}

#[async_trait]
impl Transform for AddFieldTransform {
    fn name(&self) -> &str {
        "ADD_FIELD"
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        let mut record = record;
        self.path.set(&mut record, self.value.clone())?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn add_field(field: &str, value: Value) -> AddFieldTransform {
        AddFieldTransform::new(&AddFieldConfig {
            field: field.to_owned(),
            value,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_nested_path_round_trip() {
        let transform = add_field("a.b.c", json!({"deep": [1, 2]}));

        let output = transform
            .transform_one(json!({"a": {"b": {"sibling": true}}, "top": 1}))
            .await
            .unwrap();

        let path = FieldPath::parse("a.b.c").unwrap();
        assert_eq!(path.get(&output), Some(&json!({"deep": [1, 2]})));
        assert_eq!(output["a"]["b"]["sibling"], json!(true));
        assert_eq!(output["top"], json!(1));
    }

    #[tokio::test]
    async fn test_overwrites_existing_value() {
        let transform = add_field("source", json!("import"));

        let output = transform.transform_one(json!({"source": "api"})).await.unwrap();

        assert_eq!(output, json!({"source": "import"}));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let transform = add_field("meta.batch", json!(7));
        let records = vec![json!({}), json!({"meta": {"id": 1}})];

        let output = transform.transform_many(records).await.unwrap();

        assert_eq!(
            output,
            vec![
                json!({"meta": {"batch": 7}}),
                json!({"meta": {"id": 1, "batch": 7}})
            ]
        );
    }

    #[tokio::test]
    async fn test_non_object_record_fails() {
        let transform = add_field("x", json!(1));

        let err = transform.transform_one(json!([1, 2])).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
