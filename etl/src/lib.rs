//! Configurable ETL pipeline engine.
//!
//! A pipeline is described declaratively as one source, an ordered list of transforms and one
//! sink. The [`registry::Registry`] turns component descriptors into live connectors, the
//! [`transform::resolver`] turns built-in transform configurations into executable
//! [`transform::Transform`]s, and the [`pipeline::Pipeline`] runs connect, read, transform,
//! write and disconnect with cleanup guaranteed on every exit path.
//!
//! Most callers go through [`builder::PipelineBuilder`]:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use etl::builder::PipelineBuilder;
//! use etl::registry::Registry;
//!
//! # async fn run() -> etl::error::EtlResult<()> {
//! let registry = Arc::new(Registry::new());
//! // Register sources and sinks on `registry` here.
//! let mut pipeline = PipelineBuilder::new(registry).build_from_path("pipeline.json").await?;
//! let report = pipeline.run().await?;
//! println!("wrote {} records", report.records_written);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod concurrency;
pub mod conversions;
pub mod error;
mod macros;
pub mod path;
pub mod pipeline;
pub mod registry;
pub mod sink;
pub mod source;
pub mod transform;
pub mod types;
