//! Record transformations.
//!
//! Every transform implements [`Transform`], exposing a single-record and a batch operation.
//! Built-in transforms are created from [`etl_config::shared::TransformConfig`] by
//! [`resolver::TransformResolver`]; custom transforms are registered on the
//! [`crate::registry::Registry`]. A [`TransformChain`] composes transforms in order.

mod add_field;
mod base;
mod chain;
mod enrich;
pub mod fetcher;
mod field_mapping;
mod filter;
mod map;
pub mod resolver;

pub use add_field::AddFieldTransform;
pub use base::Transform;
pub use chain::TransformChain;
pub use enrich::EnrichTransform;
pub use field_mapping::FieldMappingTransform;
pub use filter::{FilterTransform, evaluate_filter};
pub use map::MapTransform;
