//! Reference connectors for the ETL engine.
//!
//! Each connector is built from a [`ComponentDescriptor`](etl_config::shared::ComponentDescriptor)
//! by a factory registered with [`register_builtin_connectors`]:
//!
//! | Type        | Capability | Description                                      |
//! |-------------|------------|--------------------------------------------------|
//! | `json_file` | source     | Reads a JSON array or object from `location`.    |
//! | `json_file` | sink       | Writes the batch as a JSON array to `location`.  |
//! | `http`      | source     | Fetches a JSON array or object from `location`.  |
//! | `log`       | sink       | Logs every record at `info`.                     |

use etl::registry::Registry;
use etl::sink::Sink;
use etl::source::Source;

pub mod http;
pub mod json_file;
pub mod log;

pub use http::HttpSource;
pub use json_file::{JsonFileSink, JsonFileSource};
pub use log::LogSink;

/// Type tag of the JSON file source and sink.
pub const JSON_FILE_TYPE: &str = "json_file";
/// Type tag of the HTTP source.
pub const HTTP_TYPE: &str = "http";
/// Type tag of the log sink.
pub const LOG_TYPE: &str = "log";

/// Registers every connector of this crate with `registry`.
pub fn register_builtin_connectors(registry: &Registry) {
    registry.register_source(JSON_FILE_TYPE, |descriptor| {
        Ok(Box::new(JsonFileSource::from_descriptor(descriptor)?) as Box<dyn Source>)
    });
    registry.register_source(HTTP_TYPE, |descriptor| {
        Ok(Box::new(HttpSource::from_descriptor(descriptor)?) as Box<dyn Source>)
    });

    registry.register_sink(JSON_FILE_TYPE, |descriptor| {
        Ok(Box::new(JsonFileSink::from_descriptor(descriptor)?) as Box<dyn Sink>)
    });
    registry.register_sink(LOG_TYPE, |descriptor| {
        Ok(Box::new(LogSink::from_descriptor(descriptor)) as Box<dyn Sink>)
    });
}
