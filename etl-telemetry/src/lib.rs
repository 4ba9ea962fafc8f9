//! Logging setup shared by the pipeline engine, its connectors and the runner binary.

pub mod tracing;
