//! Loose value conversions used by the built-in transforms.
//!
//! Records are schema-less, so operators frequently compare or rewrite values of mismatched
//! JSON types. These helpers define the coercions once.

pub mod bool;
pub mod numeric;
pub mod string;
