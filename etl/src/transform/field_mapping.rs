use async_trait::async_trait;
use etl_config::shared::FieldMappingConfig;
use serde_json::{Map, Value};

use crate::error::EtlResult;
use crate::path::FieldPath;
use crate::transform::Transform;
use crate::types::Record;

/// Moves values from source paths to target paths.
///
/// Source paths that do not resolve produce no target field. Unless `dropUnmapped` is set, every
/// top-level field that is not itself a mapped source path is copied unchanged; mapped values are
/// written afterwards and win on conflicts.
#[derive(Debug, Clone)]
pub struct FieldMappingTransform {
    mappings: Vec<(FieldPath, FieldPath)>,
    drop_unmapped: bool,
}

impl FieldMappingTransform {
    pub fn new(config: &FieldMappingConfig) -> EtlResult<Self> {
        let mappings = config
            .field_map
            .iter()
            .map(|(source, target)| Ok((FieldPath::parse(source)?, FieldPath::parse(target)?)))
            .collect::<EtlResult<Vec<_>>>()?;

        Ok(Self {
            mappings,
            drop_unmapped: config.drop_unmapped,
        })
    }

    fn is_mapped_source(&self, key: &str) -> bool {
        self.mappings
            .iter()
            .any(|(source, _)| source.as_str() == key)
    }
}

#[async_trait]
impl Transform for FieldMappingTransform {
    fn name(&self) -> &str {
        "FIELD_MAPPING"
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        let mut output = Value::Object(Map::new());

        if !self.drop_unmapped
            && let (Value::Object(fields), Value::Object(target)) = (&record, &mut output)
        {
            for (key, value) in fields {
                if !self.is_mapped_source(key) {
                    target.insert(key.clone(), value.clone());
                }
            }
        }

        for (source, target) in &self.mappings {
            if let Some(value) = source.get(&record) {
                target.set(&mut output, value.clone())?;
            }
        }

        Ok(output)
    }
}
