//! Record sink abstractions.
//!
//! Sinks receive the fully transformed batch at the end of a pipeline run. Concrete connectors
//! live outside the engine; [`memory::MemorySink`] is provided for tests and demos.

mod base;
pub mod memory;

pub use base::Sink;
