//! Configuration types and loading for ETL pipelines.
//!
//! [`shared`] holds the serde shapes of the pipeline document and the runtime settings of the
//! runner. [`load_config`] assembles runtime settings from files and environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::{Environment, UnknownEnvironment};
pub use load::{Config, LoadConfigError, load_config, load_config_from};
