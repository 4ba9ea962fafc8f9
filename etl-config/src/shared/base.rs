use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A component descriptor has an empty `type` tag.
    #[error("`{0}.type` cannot be empty")]
    EmptyComponentType(String),
    /// A transform names an empty field path.
    #[error("`{transform}` transform requires a non-empty `{field}`")]
    EmptyField {
        transform: &'static str,
        field: &'static str,
    },
    /// A membership operator was configured with a non-array value.
    #[error("`{operator}` filter requires an array `value`")]
    MembershipValueNotArray { operator: &'static str },
    /// Enrich is configured to fall back without a fallback record.
    #[error("`ENRICH` transform with `onError: fallback` requires a `fallback` record")]
    MissingFallback,
    /// A field holds a value outside its allowed range.
    #[error("Invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}

impl ValidationError {
    /// Returns `true` when the error concerns a built-in transform rather than a descriptor or
    /// runtime setting.
    pub fn is_transform_error(&self) -> bool {
        matches!(
            self,
            ValidationError::EmptyField { .. }
                | ValidationError::MembershipValueNotArray { .. }
                | ValidationError::MissingFallback
        )
    }
}
