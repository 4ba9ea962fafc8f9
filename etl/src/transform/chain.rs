use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::transform::Transform;
use crate::types::{Batch, Record};

/// Default name of a chain, used in logs.
const CHAIN_NAME: &str = "CHAIN";

/// Ordered composition of transforms applied one after another.
///
/// The output of each stage is the input of the next; no check is made that consecutive stages
/// agree on record shape. A chain without stages is the identity transform.
pub struct TransformChain {
    name: String,
    stages: Vec<Box<dyn Transform>>,
}

impl TransformChain {
    /// Creates a chain applying `stages` in order.
    pub fn new(stages: Vec<Box<dyn Transform>>) -> Self {
        Self {
            name: CHAIN_NAME.to_owned(),
            stages,
        }
    }

    /// Creates a chain from a list that may be missing.
    ///
    /// A missing list is a configuration error raised here, before any record is processed. An
    /// empty list yields the identity chain.
    pub fn try_new(stages: Option<Vec<Box<dyn Transform>>>) -> EtlResult<Self> {
        let Some(stages) = stages else {
            bail!(
                ErrorKind::ConfigError,
                "Transform chain requires a list of transforms"
            );
        };

        Ok(Self::new(stages))
    }

    /// Renames the chain and returns it.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the stages of the chain in application order.
    pub fn stages(&self) -> &[Box<dyn Transform>] {
        &self.stages
    }

    /// Returns the stage names in application order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for TransformChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformChain")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[async_trait]
impl Transform for TransformChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform_one(&self, record: Record) -> EtlResult<Record> {
        let mut record = record;
        for stage in &self.stages {
            record = stage.transform_one(record).await?;
        }

        Ok(record)
    }

    /// Runs each stage's batch operation in order.
    ///
    /// An empty batch is returned as is without invoking any stage, also when an earlier stage
    /// removed every record.
    async fn transform_many(&self, records: Batch) -> EtlResult<Batch> {
        let mut records = records;
        for stage in &self.stages {
            if records.is_empty() {
                debug!(chain = %self.name, stage = stage.name(), "skipping stage for empty batch");
                break;
            }

            records = stage.transform_many(records).await?;
        }

        Ok(records)
    }
}
