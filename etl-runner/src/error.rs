use etl::error::EtlError;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Backtrace captured when a non-pipeline error is created.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for the runner binary.
///
/// Wraps [`EtlError`] for anything raised while building or running the pipeline and adds
/// variants for the runner's own setup.
#[derive(Debug)]
pub enum RunnerError {
    /// Pipeline build or run error.
    Etl(EtlError),
    /// Configuration error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl RunnerError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            RunnerError::Etl(err) if err.kind().is_configuration() => {
                "pipeline configuration error"
            }
            RunnerError::Etl(_) => "pipeline error",
            RunnerError::Config(_, _) => "configuration error",
            RunnerError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        match self {
            RunnerError::Etl(err) => err.backtrace(),
            RunnerError::Config(_, cb) => &cb.0,
            RunnerError::Io(_, cb) => &cb.0,
        }
    }

    /// Creates a configuration error from any error.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        RunnerError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("etl-runner failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        if let RunnerError::Etl(err) = self {
            out.push_str(&format!("code: {:?}\n", err.kind()));
        }
        out.push_str(&format!("error: {}\n", self));

        let mut source = Error::source(self);
        let mut idx = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {idx}: {err}\n"));
            source = err.source();
            idx += 1;
        }

        if should_render_backtrace() {
            out.push_str("backtrace:\n");
            out.push_str(&self.backtrace().to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Etl(err) => match err.detail() {
                Some(detail) => write!(f, "{}: {detail}", err.description()),
                None => write!(f, "{}", err.description()),
            },
            RunnerError::Config(source, _) => write!(f, "configuration error: {source}"),
            RunnerError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for RunnerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunnerError::Etl(err) => err.source(),
            RunnerError::Config(source, _) => Some(source.as_ref()),
            RunnerError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(err: std::io::Error) -> Self {
        RunnerError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<EtlError> for RunnerError {
    fn from(err: EtlError) -> Self {
        RunnerError::Etl(err)
    }
}
