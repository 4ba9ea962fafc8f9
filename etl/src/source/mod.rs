//! Record source abstractions.
//!
//! Sources produce the batch a pipeline run starts from. Concrete connectors live outside the
//! engine; [`memory::MemorySource`] is provided for tests and demos.

mod base;
pub mod memory;

pub use base::Source;
