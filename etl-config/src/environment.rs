use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Variable selecting the environment override file.
const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

/// Runtime environment of the process.
///
/// Selects which `configuration/{environment}.*` file is layered over the base file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

/// Returned when `APP_ENVIRONMENT` names an environment other than `dev` or `prod`.
#[derive(Debug, Error)]
#[error("`{0}` is not a supported environment, expected `dev` or `prod`")]
pub struct UnknownEnvironment(String);

impl Environment {
    /// Reads `APP_ENVIRONMENT`, defaulting to [`Environment::Dev`] when it is unset.
    pub fn load() -> Result<Environment, UnknownEnvironment> {
        std::env::var(APP_ENVIRONMENT_ENV_NAME)
            .ok()
            .map_or(Ok(Environment::default()), |value| value.parse())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    /// Parses an environment name, ignoring case and surrounding whitespace.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [Environment::Dev, Environment::Prod]
            .into_iter()
            .find(|environment| value.trim().eq_ignore_ascii_case(environment.as_str()))
            .ok_or_else(|| UnknownEnvironment(value.to_owned()))
    }
}
