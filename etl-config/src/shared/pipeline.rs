use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::shared::{TransformConfig, ValidationError};

/// Identifies which registered factory builds a component and with what parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Registered type tag, matched exactly.
    #[serde(rename = "type")]
    pub component_type: String,
    /// Connector-specific address, such as a file path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Free-form connector options.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl ComponentDescriptor {
    /// Creates a descriptor with only a type tag.
    pub fn new(component_type: impl Into<String>) -> Self {
        Self {
            component_type: component_type.into(),
            location: None,
            options: Map::new(),
        }
    }

    /// Sets the location and returns the modified descriptor.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Adds an option and returns the modified descriptor.
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Returns the option stored under `key`.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Returns the option stored under `key` if it is a string.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Returns the option stored under `key` if it is a boolean.
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }

    /// Checks that the type tag is present; `role` names the descriptor in the error.
    pub fn validate(&self, role: &str) -> Result<(), ValidationError> {
        if self.component_type.trim().is_empty() {
            return Err(ValidationError::EmptyComponentType(role.to_string()));
        }

        Ok(())
    }
}

/// One entry of the pipeline's `transforms` list.
///
/// Entries whose `type` is a built-in tag parse as [`TransformConfig`]; any other tag is kept as a
/// [`ComponentDescriptor`] and resolved through the registry's transform namespace.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransformDeclaration {
    Builtin(TransformConfig),
    Component(ComponentDescriptor),
}

impl TransformDeclaration {
    /// Returns the `type` tag of the declaration.
    pub fn type_tag(&self) -> &str {
        match self {
            TransformDeclaration::Builtin(config) => config.type_tag(),
            TransformDeclaration::Component(descriptor) => &descriptor.component_type,
        }
    }
}

impl From<TransformConfig> for TransformDeclaration {
    fn from(config: TransformConfig) -> Self {
        TransformDeclaration::Builtin(config)
    }
}

impl<'de> Deserialize<'de> for TransformDeclaration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        let Some(tag) = value.get("type").and_then(Value::as_str) else {
            return Err(D::Error::custom("transform declaration requires a string `type`"));
        };

        if TransformConfig::is_builtin_tag(tag) {
            serde_json::from_value(value)
                .map(TransformDeclaration::Builtin)
                .map_err(D::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(TransformDeclaration::Component)
                .map_err(D::Error::custom)
        }
    }
}

/// Declarative description of a whole pipeline: one source, transforms, one sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Optional human-readable name used in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: ComponentDescriptor,
    /// Transform stages in order; a missing list is rejected when the chain is built.
    #[serde(default)]
    pub transforms: Option<Vec<TransformDeclaration>>,
    pub sink: ComponentDescriptor,
}

impl PipelineConfig {
    /// Validates the descriptors and every built-in transform.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate("source")?;
        self.sink.validate("sink")?;

        for (index, declaration) in self.transforms.iter().flatten().enumerate() {
            match declaration {
                TransformDeclaration::Builtin(config) => config.validate()?,
                TransformDeclaration::Component(descriptor) => {
                    descriptor.validate(&format!("transforms[{index}]"))?
                }
            }
        }

        Ok(())
    }
}
