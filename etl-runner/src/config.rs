use std::path::PathBuf;

use etl_config::load_config;
use etl_config::shared::{RunnerConfig, ValidationError};

use crate::error::{RunnerError, RunnerResult};

/// Loads and validates the runner configuration.
///
/// A pipeline path passed on the command line takes precedence over the configured one.
pub fn load_runner_config(pipeline_path: Option<PathBuf>) -> RunnerResult<RunnerConfig> {
    let mut config = load_config::<RunnerConfig>().map_err(RunnerError::config)?;
    if pipeline_path.is_some() {
        config.pipeline_path = pipeline_path;
    }

    config.validate().map_err(RunnerError::config)?;
    if config.pipeline_path.is_none() {
        return Err(RunnerError::config(ValidationError::InvalidFieldValue {
            field: "pipeline_path".to_string(),
            constraint: "must be set in the configuration or with `--pipeline`".to_string(),
        }));
    }

    Ok(config)
}
