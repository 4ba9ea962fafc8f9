use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::ValidationError;

/// Settings of the HTTP client shared by enrichment and HTTP connectors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl HttpConfig {
    /// Default request timeout in milliseconds.
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    HttpConfig::DEFAULT_TIMEOUT_MS
}

/// Runtime settings of the pipeline runner binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Path of the pipeline document to run.
    #[serde(default)]
    pub pipeline_path: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpConfig,
}

impl RunnerConfig {
    /// Validates the runner settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.http.timeout_ms == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "http.timeout_ms".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Config for RunnerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}
