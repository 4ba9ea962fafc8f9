//! Coordination primitives shared by pipeline runs.

pub mod shutdown;
