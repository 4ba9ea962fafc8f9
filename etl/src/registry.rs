//! Catalog mapping component type tags to factories.
//!
//! The registry holds one independent namespace per [`Capability`], so the same tag may be
//! registered as a source and as a sink without collision. Lookups match the tag exactly.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use etl_config::shared::ComponentDescriptor;
use tracing::{debug, warn};

use crate::error::{ErrorKind, EtlResult};
use crate::etl_error;
use crate::sink::Sink;
use crate::source::Source;
use crate::transform::Transform;

/// Role a component plays in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Source,
    Transform,
    Sink,
}

impl Capability {
    /// Returns the lowercase name of the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Source => "source",
            Capability::Transform => "transform",
            Capability::Sink => "sink",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a [`Source`] from its descriptor.
pub type SourceFactory =
    Arc<dyn Fn(&ComponentDescriptor) -> EtlResult<Box<dyn Source>> + Send + Sync>;

/// Builds a [`Transform`] from its descriptor.
pub type TransformFactory =
    Arc<dyn Fn(&ComponentDescriptor) -> EtlResult<Box<dyn Transform>> + Send + Sync>;

/// Builds a [`Sink`] from its descriptor.
pub type SinkFactory = Arc<dyn Fn(&ComponentDescriptor) -> EtlResult<Box<dyn Sink>> + Send + Sync>;

static GLOBAL_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// Component registry with one namespace per capability.
///
/// Registration overwrites any previous factory under the same tag and hands the previous one
/// back, so callers can detect shadowing. Every `create_*` call invokes the factory again; the
/// registry never caches instances.
#[derive(Default)]
pub struct Registry {
    sources: RwLock<HashMap<String, SourceFactory>>,
    transforms: RwLock<HashMap<String, TransformFactory>>,
    sinks: RwLock<HashMap<String, SinkFactory>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lazily created process-wide registry.
    pub fn global() -> Arc<Registry> {
        GLOBAL_REGISTRY.clone()
    }

    /// Registers a source factory under `component_type`, returning the factory it replaced.
    pub fn register_source<F>(
        &self,
        component_type: impl Into<String>,
        factory: F,
    ) -> Option<SourceFactory>
    where
        F: Fn(&ComponentDescriptor) -> EtlResult<Box<dyn Source>> + Send + Sync + 'static,
    {
        let component_type = component_type.into();
        let previous = write(&self.sources).insert(component_type.clone(), Arc::new(factory));
        log_registration(Capability::Source, &component_type, previous.is_some());

        previous
    }

    /// Registers a transform factory under `component_type`, returning the factory it replaced.
    pub fn register_transform<F>(
        &self,
        component_type: impl Into<String>,
        factory: F,
    ) -> Option<TransformFactory>
    where
        F: Fn(&ComponentDescriptor) -> EtlResult<Box<dyn Transform>> + Send + Sync + 'static,
    {
        let component_type = component_type.into();
        let previous = write(&self.transforms).insert(component_type.clone(), Arc::new(factory));
        log_registration(Capability::Transform, &component_type, previous.is_some());

        previous
    }

    /// Registers a sink factory under `component_type`, returning the factory it replaced.
    pub fn register_sink<F>(
        &self,
        component_type: impl Into<String>,
        factory: F,
    ) -> Option<SinkFactory>
    where
        F: Fn(&ComponentDescriptor) -> EtlResult<Box<dyn Sink>> + Send + Sync + 'static,
    {
        let component_type = component_type.into();
        let previous = write(&self.sinks).insert(component_type.clone(), Arc::new(factory));
        log_registration(Capability::Sink, &component_type, previous.is_some());

        previous
    }

    /// Builds a new source from `descriptor`.
    ///
    /// Fails with [`ErrorKind::UnknownComponentType`] when no source is registered under the
    /// descriptor's type.
    pub fn create_source(&self, descriptor: &ComponentDescriptor) -> EtlResult<Box<dyn Source>> {
        // The lock is released before the factory runs so factories may use the registry.
        let factory = read(&self.sources).get(&descriptor.component_type).cloned();
        let factory = factory.ok_or_else(|| unknown_type(Capability::Source, descriptor))?;

        factory(descriptor)
    }

    /// Builds a new transform from `descriptor`.
    ///
    /// Fails with [`ErrorKind::UnknownComponentType`] when no transform is registered under the
    /// descriptor's type.
    pub fn create_transform(
        &self,
        descriptor: &ComponentDescriptor,
    ) -> EtlResult<Box<dyn Transform>> {
        let factory = read(&self.transforms)
            .get(&descriptor.component_type)
            .cloned();
        let factory = factory.ok_or_else(|| unknown_type(Capability::Transform, descriptor))?;

        factory(descriptor)
    }

    /// Builds a new sink from `descriptor`.
    ///
    /// Fails with [`ErrorKind::UnknownComponentType`] when no sink is registered under the
    /// descriptor's type.
    pub fn create_sink(&self, descriptor: &ComponentDescriptor) -> EtlResult<Box<dyn Sink>> {
        let factory = read(&self.sinks).get(&descriptor.component_type).cloned();
        let factory = factory.ok_or_else(|| unknown_type(Capability::Sink, descriptor))?;

        factory(descriptor)
    }

    /// Returns `true` when a factory is registered under `component_type` for `capability`.
    pub fn contains(&self, capability: Capability, component_type: &str) -> bool {
        match capability {
            Capability::Source => read(&self.sources).contains_key(component_type),
            Capability::Transform => read(&self.transforms).contains_key(component_type),
            Capability::Sink => read(&self.sinks).contains_key(component_type),
        }
    }

    /// Returns the sorted type tags registered for `capability`.
    pub fn component_types(&self, capability: Capability) -> Vec<String> {
        let mut types: Vec<String> = match capability {
            Capability::Source => read(&self.sources).keys().cloned().collect(),
            Capability::Transform => read(&self.transforms).keys().cloned().collect(),
            Capability::Sink => read(&self.sinks).keys().cloned().collect(),
        };
        types.sort();

        types
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("sources", &self.component_types(Capability::Source))
            .field("transforms", &self.component_types(Capability::Transform))
            .field("sinks", &self.component_types(Capability::Sink))
            .finish()
    }
}

// A panic while holding the lock cannot leave a map half-updated, so poisoning is ignored.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn log_registration(capability: Capability, component_type: &str, replaced: bool) {
    if replaced {
        warn!(%capability, component_type, "replaced previously registered factory");
    } else {
        debug!(%capability, component_type, "registered factory");
    }
}

fn unknown_type(
    capability: Capability,
    descriptor: &ComponentDescriptor,
) -> crate::error::EtlError {
    etl_error!(
        ErrorKind::UnknownComponentType,
        "Unknown component type",
        format!(
            "no {capability} registered for type `{}`",
            descriptor.component_type
        )
    )
}
