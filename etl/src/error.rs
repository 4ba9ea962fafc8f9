//! Error types and result definitions for ETL operations.
//!
//! Provides a classified error system with captured diagnostic metadata for pipeline
//! composition and execution. Every [`EtlError`] carries a kind, a static description and an
//! optional detail and source.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::registry::Capability;

/// Convenient result type for ETL operations using [`EtlError`] as the error type.
pub type EtlResult<T> = Result<T, EtlError>;

/// Detailed payload stored for each [`EtlError`].
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for ETL operations.
///
/// Every error carries an [`ErrorKind`], which doubles as the machine-readable code exposed to
/// callers of [`crate::pipeline::Pipeline::run`].
#[derive(Debug, Clone)]
pub struct EtlError {
    payload: ErrorPayload,
}

/// Specific categories of errors that can occur while composing or running a pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,
    UnknownComponentType,
    InvalidTransformConfig,

    // Source Errors
    SourceConnectionFailed,
    SourceReadFailed,
    SourceDisconnectFailed,

    // Sink Errors
    SinkConnectionFailed,
    SinkWriteFailed,
    SinkDisconnectFailed,

    // Transform Errors
    TransformFailed,
    FilterRejected,
    EnrichmentFailed,
    InvalidData,

    // IO & Serialization Errors
    IoError,
    HttpRequestFailed,
    SerializationError,
    DeserializationError,

    // State & Workflow Errors
    InvalidState,
    PipelineCancelled,
}

impl ErrorKind {
    /// Returns the component capability this kind of error originates from, if any.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            ErrorKind::SourceConnectionFailed
            | ErrorKind::SourceReadFailed
            | ErrorKind::SourceDisconnectFailed => Some(Capability::Source),
            ErrorKind::SinkConnectionFailed
            | ErrorKind::SinkWriteFailed
            | ErrorKind::SinkDisconnectFailed => Some(Capability::Sink),
            ErrorKind::TransformFailed
            | ErrorKind::FilterRejected
            | ErrorKind::EnrichmentFailed
            | ErrorKind::InvalidTransformConfig => Some(Capability::Transform),
            _ => None,
        }
    }

    /// Returns `true` for errors raised while resolving configuration, before any I/O.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorKind::ConfigError
                | ErrorKind::UnknownComponentType
                | ErrorKind::InvalidTransformConfig
        )
    }
}

impl EtlError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the capability the error originates from, derived from its kind.
    pub fn capability(&self) -> Option<Capability> {
        self.kind().capability()
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        &self.payload.backtrace
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.payload.source = Some(Arc::new(source));
        self
    }

    /// Classifies this error as a failure of a pipeline stage.
    ///
    /// Errors that already originate from the stage's capability are returned untouched so the
    /// connector's own code survives. Any other error is wrapped in a new error of `kind`, keeping
    /// the original as its source.
    #[track_caller]
    pub fn in_stage(self, kind: ErrorKind, description: &'static str) -> EtlError {
        if self.capability().is_some() && self.capability() == kind.capability() {
            return self;
        }

        let detail = match self.detail() {
            Some(detail) => format!("{:?}: {}", self.kind(), detail),
            None => format!("{:?}", self.kind()),
        };

        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(self)),
        )
    }

    /// Creates an [`EtlError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        EtlError {
            payload: ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            },
        }
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        self.kind() == other.kind()
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        let payload = &self.payload;
        let location = payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            payload.kind,
            payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        write_detail(payload.detail.as_deref(), f, 1)?;
        write_backtrace(payload.backtrace.as_ref(), f, 1)?;

        Ok(())
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

/// Writes the captured backtrace with indentation.
fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let indent_str = "  ".repeat(indent);

    let rendered_backtrace = format!("{backtrace}");
    if !rendered_backtrace.trim().is_empty() {
        write!(f, "\n{indent_str}Backtrace:")?;
        for line in rendered_backtrace.lines() {
            if line.trim().is_empty() {
                write!(f, "\n{indent_str}  ")?;
            } else {
                write!(f, "\n{indent_str}  {line}")?;
            }
        }
    }

    Ok(())
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    let indent_str = "  ".repeat(indent);
    if detail.trim().is_empty() {
        return write!(f, "\n{indent_str}Detail: <empty>");
    }

    write!(f, "\n{indent_str}Detail:")?;
    for line in detail.lines() {
        if line.trim().is_empty() {
            write!(f, "\n{indent_str}  ")?;
        } else {
            write!(f, "\n{indent_str}  {line}")?;
        }
    }

    Ok(())
}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    #[track_caller]
    fn from(err: std::io::Error) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`EtlError`] with the appropriate error kind.
///
/// Maps to [`ErrorKind::IoError`] for I/O failures and [`ErrorKind::DeserializationError`] for
/// syntax, data and end-of-input failures.
impl From<serde_json::Error> for EtlError {
    #[track_caller]
    fn from(err: serde_json::Error) -> EtlError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`reqwest::Error`] to [`EtlError`] with the appropriate error kind.
///
/// Body decoding failures map to [`ErrorKind::DeserializationError`], everything else to
/// [`ErrorKind::HttpRequestFailed`].
impl From<reqwest::Error> for EtlError {
    #[track_caller]
    fn from(err: reqwest::Error) -> EtlError {
        let (kind, description) = if err.is_decode() {
            (
                ErrorKind::DeserializationError,
                "HTTP response body could not be decoded",
            )
        } else if err.is_timeout() {
            (ErrorKind::HttpRequestFailed, "HTTP request timed out")
        } else {
            (ErrorKind::HttpRequestFailed, "HTTP request failed")
        };

        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`etl_config::shared::ValidationError`] to [`EtlError`].
///
/// Errors about built-in transforms map to [`ErrorKind::InvalidTransformConfig`], all others to
/// [`ErrorKind::ConfigError`].
impl From<etl_config::shared::ValidationError> for EtlError {
    #[track_caller]
    fn from(err: etl_config::shared::ValidationError) -> EtlError {
        let (kind, description) = if err.is_transform_error() {
            (ErrorKind::InvalidTransformConfig, "Invalid transform configuration")
        } else {
            (ErrorKind::ConfigError, "Pipeline configuration is invalid")
        };

        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bail, etl_error};
    use std::error::Error;

    #[test]
    fn test_kind_and_detail() {
        let err = etl_error!(ErrorKind::SourceReadFailed, "Read failed", "file missing");

        assert_eq!(err.kind(), ErrorKind::SourceReadFailed);
        assert_eq!(err.description(), "Read failed");
        assert_eq!(err.detail(), Some("file missing"));
        assert_eq!(err.capability(), Some(Capability::Source));
    }

    #[test]
    fn test_equality_ignores_detail() {
        let a = etl_error!(ErrorKind::ConfigError, "Missing field", "source.type");
        let b = etl_error!(ErrorKind::ConfigError, "Missing field", "sink.type");

        assert_eq!(a, b);
    }

    #[test]
    fn test_in_stage_keeps_matching_capability() {
        let err = etl_error!(ErrorKind::SourceConnectionFailed, "Connection refused");
        let staged = err.in_stage(ErrorKind::SourceReadFailed, "Source read failed");

        assert_eq!(staged.kind(), ErrorKind::SourceConnectionFailed);
    }

    #[test]
    fn test_in_stage_wraps_foreign_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let staged = EtlError::from(io).in_stage(ErrorKind::SinkWriteFailed, "Sink write failed");

        assert_eq!(staged.kind(), ErrorKind::SinkWriteFailed);
        assert_eq!(staged.capability(), Some(Capability::Sink));

        let source = staged.source().expect("wrapped error keeps its source");
        assert!(source.to_string().contains("I/O operation failed"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let err: EtlError = serde_json::from_str::<serde_json::Value>("{")
            .map_err(EtlError::from)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }

    #[test]
    fn test_validation_error_kinds() {
        use etl_config::shared::ValidationError;

        let transform = EtlError::from(ValidationError::MissingFallback);
        let descriptor = EtlError::from(ValidationError::EmptyComponentType("sink".to_owned()));

        assert_eq!(transform.kind(), ErrorKind::InvalidTransformConfig);
        assert_eq!(descriptor.kind(), ErrorKind::ConfigError);
        assert_eq!(descriptor.detail(), Some("`sink.type` cannot be empty"));
    }

    #[test]
    fn test_bail_returns_early() {
        fn fails() -> EtlResult<()> {
            bail!(ErrorKind::InvalidState, "Pipeline already ran");
        }

        assert_eq!(fails().unwrap_err().kind(), ErrorKind::InvalidState);
    }
}
