//! Builds [`Pipeline`]s from pipeline configuration documents.

use std::path::Path;
use std::sync::Arc;

use etl_config::shared::PipelineConfig;
use serde_json::Value;
use tracing::info;

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::pipeline::Pipeline;
use crate::registry::Registry;
use crate::transform::fetcher::Fetcher;
use crate::transform::resolver::TransformResolver;

/// Resolves pipeline documents against a [`Registry`].
///
/// Every component is resolved before the pipeline is returned, so an unknown type or an invalid
/// transform is reported before any connector performs I/O.
#[derive(Clone)]
pub struct PipelineBuilder {
    registry: Arc<Registry>,
    resolver: TransformResolver,
}

impl PipelineBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            resolver: TransformResolver::new(),
        }
    }

    /// Creates a builder using the process-wide [`Registry::global`].
    pub fn with_global_registry() -> Self {
        Self::new(Registry::global())
    }

    /// Uses `fetcher` for every enrich transform built from now on.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.resolver = TransformResolver::with_fetcher(fetcher);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Builds a pipeline from a typed configuration.
    pub fn build(&self, config: &PipelineConfig) -> EtlResult<Pipeline> {
        config.validate()?;

        let source = self.registry.create_source(&config.source)?;
        let sink = self.registry.create_sink(&config.sink)?;

        let mut resolver = self.resolver.clone();
        let chain = resolver.resolve_chain(config.transforms.as_deref(), &self.registry)?;

        let mut pipeline = Pipeline::new(source, chain, sink);
        if let Some(name) = &config.name {
            pipeline = pipeline.with_name(name);
        }

        info!(
            pipeline = pipeline.name(),
            source = %config.source.component_type,
            sink = %config.sink.component_type,
            transforms = ?pipeline.chain().stage_names(),
            "built pipeline"
        );

        Ok(pipeline)
    }

    /// Builds a pipeline from a JSON document value.
    pub fn build_from_value(&self, document: Value) -> EtlResult<Pipeline> {
        let config = serde_json::from_value(document).map_err(|err| {
            etl_error!(
                ErrorKind::ConfigError,
                "Invalid pipeline document",
                err.to_string(),
                source: err
            )
        })?;

        self.build(&config)
    }

    /// Builds a pipeline from JSON text.
    pub fn build_from_str(&self, document: &str) -> EtlResult<Pipeline> {
        let config = serde_json::from_str(document).map_err(|err| {
            etl_error!(
                ErrorKind::ConfigError,
                "Invalid pipeline document",
                err.to_string(),
                source: err
            )
        })?;

        self.build(&config)
    }

    /// Reads a JSON document from `path` and builds a pipeline from it.
    pub async fn build_from_path(&self, path: impl AsRef<Path>) -> EtlResult<Pipeline> {
        let path = path.as_ref();
        let document = tokio::fs::read_to_string(path).await.map_err(|err| {
            etl_error!(
                ErrorKind::ConfigError,
                "Pipeline document could not be read",
                format!("{}: {err}", path.display()),
                source: err
            )
        })?;

        self.build_from_str(&document)
    }
}
