//! Shared configuration types for ETL pipelines.

mod base;
mod pipeline;
mod runner;
mod transform;

pub use base::ValidationError;
pub use pipeline::{ComponentDescriptor, PipelineConfig, TransformDeclaration};
pub use runner::{HttpConfig, RunnerConfig};
pub use transform::{
    AddFieldConfig, CompositeConfig, EnrichConfig, EnrichErrorPolicy, FieldMappingConfig,
    FilterConfig, FilterOperator, MapConfig, MapOperation, MapStep, TransformConfig,
};
