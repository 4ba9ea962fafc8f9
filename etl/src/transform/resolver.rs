//! Turns declarative transform configurations into executable transforms.

use std::sync::Arc;

use etl_config::shared::{TransformConfig, TransformDeclaration};
use tracing::debug;

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::registry::Registry;
use crate::transform::fetcher::{Fetcher, HttpFetcher};
use crate::transform::{
    AddFieldTransform, EnrichTransform, FieldMappingTransform, FilterTransform, MapTransform,
    Transform, TransformChain,
};

/// Builds transforms from [`TransformConfig`] variants and [`TransformDeclaration`]s.
///
/// Built-in variants are constructed directly; other declarations are looked up in the transform
/// namespace of the [`Registry`]. Enrich transforms share the resolver's [`Fetcher`], which
/// defaults to an [`HttpFetcher`] created on first use.
#[derive(Clone, Default)]
pub struct TransformResolver {
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl TransformResolver {
    /// Creates a resolver using the default HTTP fetcher for enrichment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver issuing enrichment requests through `fetcher`.
    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
        }
    }

    /// Resolves one built-in configuration variant.
    ///
    /// The configuration is validated first; invalid configurations fail with
    /// [`ErrorKind::InvalidTransformConfig`].
    pub fn resolve(&mut self, config: &TransformConfig) -> EtlResult<Box<dyn Transform>> {
        config.validate().map_err(|err| {
            etl_error!(
                ErrorKind::InvalidTransformConfig,
                "Invalid transform configuration",
                err.to_string(),
                source: err
            )
        })?;

        debug!(transform = config.type_tag(), "resolving transform");

        let transform: Box<dyn Transform> = match config {
            TransformConfig::FieldMapping(config) => Box::new(FieldMappingTransform::new(config)?),
            TransformConfig::Filter(config) => Box::new(FilterTransform::new(config)?),
            TransformConfig::Map(config) => Box::new(MapTransform::new(config)?),
            TransformConfig::AddField(config) => Box::new(AddFieldTransform::new(config)?),
            TransformConfig::Enrich(config) => {
                Box::new(EnrichTransform::new(config, self.fetcher()?)?)
            }
            TransformConfig::Composite(config) => {
                let stages = config
                    .transforms
                    .iter()
                    .map(|member| self.resolve(member))
                    .collect::<EtlResult<Vec<_>>>()?;

                Box::new(TransformChain::new(stages).with_name("COMPOSITE"))
            }
        };

        Ok(transform)
    }

    /// Resolves one entry of a pipeline's transform list.
    pub fn resolve_declaration(
        &mut self,
        declaration: &TransformDeclaration,
        registry: &Registry,
    ) -> EtlResult<Box<dyn Transform>> {
        match declaration {
            TransformDeclaration::Builtin(config) => self.resolve(config),
            TransformDeclaration::Component(descriptor) => registry.create_transform(descriptor),
        }
    }

    /// Resolves a pipeline's transform list into a [`TransformChain`].
    ///
    /// A missing list fails with [`ErrorKind::ConfigError`]; an empty one yields the identity
    /// chain.
    pub fn resolve_chain(
        &mut self,
        declarations: Option<&[TransformDeclaration]>,
        registry: &Registry,
    ) -> EtlResult<TransformChain> {
        let stages = declarations
            .map(|declarations| {
                declarations
                    .iter()
                    .map(|declaration| self.resolve_declaration(declaration, registry))
                    .collect::<EtlResult<Vec<_>>>()
            })
            .transpose()?;

        TransformChain::try_new(stages)
    }

    fn fetcher(&mut self) -> EtlResult<Arc<dyn Fetcher>> {
        if let Some(fetcher) = &self.fetcher {
            return Ok(fetcher.clone());
        }

        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
        self.fetcher = Some(fetcher.clone());

        Ok(fetcher)
    }
}
