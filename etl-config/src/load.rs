use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::{Environment, UnknownEnvironment};

/// Directory containing configuration files relative to the application root.
const CONFIGURATION_DIR: &str = "configuration";

/// Supported extensions for base and environment configuration files.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Stem of the configuration file every process loads.
const BASE_FILE_STEM: &str = "base";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "APP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Separator for list elements in environment variables.
const LIST_SEPARATOR: &str = ",";

/// Trait implemented by configuration structures that require list parsing help.
pub trait Config {
    /// Keys whose values should be parsed as lists when loading the configuration.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// Errors that can occur while loading configuration files and overrides.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// Failed to determine the current working directory.
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    /// The configuration directory does not exist.
    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    /// The base configuration file could not be found.
    #[error("could not locate the base configuration in `{directory}`; attempted: {attempted}")]
    BaseFileMissing { directory: PathBuf, attempted: String },

    /// A configuration file existed but could not be parsed.
    #[error("failed to load configuration file `{path}`: {source}")]
    FileLoad {
        path: PathBuf,
        source: config::ConfigError,
    },

    /// Failed to determine the runtime environment (`APP_ENVIRONMENT`).
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] UnknownEnvironment),

    /// Merging the sources failed.
    #[error("failed to build configuration: {0}")]
    Builder(#[source] config::ConfigError),

    /// The merged configuration could not be deserialized into the target type.
    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads configuration from `./configuration` in the current working directory.
///
/// See [`load_config_from`] for the source precedence.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    load_config_from(&base_path.join(CONFIGURATION_DIR))
}

/// Loads layered configuration from `directory`.
///
/// Sources, lowest precedence first:
/// 1. `base.(yaml|yml|json)`, which must exist.
/// 2. `{environment}.(yaml|yml|json)`, skipped when absent.
/// 3. `APP_`-prefixed environment variables, with `__` separating nested keys
///    (`APP_HTTP__TIMEOUT_MS`) and commas separating list values.
pub fn load_config_from<T>(directory: &Path) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(
            directory.to_path_buf(),
        ));
    }

    let environment = Environment::load()?;

    let Some(base_file) = find_configuration_file(directory, BASE_FILE_STEM) else {
        return Err(LoadConfigError::BaseFileMissing {
            directory: directory.to_path_buf(),
            attempted: attempted_paths(directory, BASE_FILE_STEM),
        });
    };

    let mut builder = config::Config::builder();
    builder = add_file_source(builder, &base_file)?;

    if let Some(environment_file) = find_configuration_file(directory, environment.as_str()) {
        builder = add_file_source(builder, &environment_file)?;
    }

    let mut environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    if !T::LIST_PARSE_KEYS.is_empty() {
        environment_source = environment_source
            .try_parsing(true)
            .list_separator(LIST_SEPARATOR);

        for key in T::LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }
    }

    let settings = builder
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

type Builder = config::builder::ConfigBuilder<config::builder::DefaultState>;

/// Adds a file source and builds once so that a malformed file is reported with its path.
fn add_file_source(builder: Builder, path: &Path) -> Result<Builder, LoadConfigError> {
    let builder = builder.add_source(config::File::from(path.to_path_buf()));

    builder
        .clone()
        .build()
        .map_err(|source| LoadConfigError::FileLoad {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(builder)
}

fn find_configuration_file(directory: &Path, stem: &str) -> Option<PathBuf> {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
}

fn attempted_paths(directory: &Path, stem: &str) -> String {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| format!("`{}`", directory.join(format!("{stem}.{extension}")).display()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Settings {
        name: String,
        #[serde(default)]
        retries: u32,
    }

    impl Config for Settings {
        const LIST_PARSE_KEYS: &'static [&'static str] = &[];
    }

    #[test]
    fn test_load_base_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.yaml"), "name: orders\nretries: 3\n").unwrap();

        let settings: Settings = load_config_from(dir.path()).unwrap();

        assert_eq!(settings.name, "orders");
        assert_eq!(settings.retries, 3);
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.yaml"), "name: orders\n").unwrap();
        std::fs::write(dir.path().join("dev.json"), r#"{"retries": 7}"#).unwrap();
        std::fs::write(dir.path().join("prod.json"), r#"{"retries": 9}"#).unwrap();

        let settings: Settings = load_config_from(dir.path()).unwrap();

        let expected = match Environment::load().unwrap() {
            Environment::Dev => 7,
            Environment::Prod => 9,
        };
        assert_eq!(settings.retries, expected);
    }

    #[test]
    fn test_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_config_from::<Settings>(dir.path()).unwrap_err();

        assert!(matches!(err, LoadConfigError::BaseFileMissing { .. }));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = load_config_from::<Settings>(&missing).unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingConfigurationDirectory(_)));
    }
}
