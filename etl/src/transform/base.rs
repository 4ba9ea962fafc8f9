use async_trait::async_trait;

use crate::error::{ErrorKind, EtlResult};
use crate::types::{Batch, Record};

/// Trait for components that rewrite records.
///
/// Implementations must provide [`Transform::transform_one`]. [`Transform::transform_many`] has
/// a default implementation applying `transform_one` to each record in order; transforms with a
/// cheaper batch form override it.
///
/// A transform may reject a single record by returning an error of kind
/// [`ErrorKind::FilterRejected`]. The default batch implementation treats such a rejection as the
/// removal of that record, while any other error aborts the whole batch.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Returns the name of the transform, used in logs and error details.
    fn name(&self) -> &str;

    /// Transforms a single record.
    async fn transform_one(&self, record: Record) -> EtlResult<Record>;

    /// Transforms a batch of records, preserving their order.
    async fn transform_many(&self, records: Batch) -> EtlResult<Batch> {
        let mut transformed = Vec::with_capacity(records.len());
        for record in records {
            match self.transform_one(record).await {
                Ok(record) => transformed.push(record),
                Err(err) if err.kind() == ErrorKind::FilterRejected => {}
                Err(err) => return Err(err),
            }
        }

        Ok(transformed)
    }
}
