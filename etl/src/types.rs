//! Core data types flowing through a pipeline.

/// A single schema-less record.
///
/// Records are arbitrary JSON values; most transforms expect an object and treat anything else
/// as a record without fields.
pub type Record = serde_json::Value;

/// The fully materialized output of one read, consumed by one write.
pub type Batch = Vec<Record>;
